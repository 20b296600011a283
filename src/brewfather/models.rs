//! Brewfather batch records and their normalization into [`Batch`].
//!
//! Every upstream-specific vocabulary (status tokens, carbonation types,
//! measured/estimated/recipe field tiers) is resolved here, once, so nothing
//! past this module ever sees a Brewfather value.

use serde::Deserialize;

use crate::data::models::{Batch, BatchStatus, Package};

/// Name Brewfather gives a batch the brewer never renamed.
pub const DEFAULT_BATCH_NAME: &str = "Batch";

/// Value of [`Batch::source`] for records from this integration.
pub const SOURCE: &str = "brewfather";

/// Field projection sent as the `include` query parameter.
///
/// Must name every field [`BrewfatherBatch`] reads; Brewfather omits anything
/// not listed here.
pub const INCLUDE_FIELDS: &[&str] = &[
    "_id",
    "batchNo",
    "bottlingDate",
    "brewDate",
    "brewer",
    "carbonationType",
    "estimatedAbv",
    "estimatedBuGuRatio",
    "estimatedColor",
    "estimatedFg",
    "estimatedIbu",
    "estimatedOg",
    "estimatedRbRatio",
    "fermentationStartDate",
    "measuredAbv",
    "measuredBuGuRatio",
    "measuredColor",
    "measuredFg",
    "measuredIbu",
    "measuredOg",
    "measuredRbRatio",
    "name",
    "recipe.abv",
    "recipe.buGuRatio",
    "recipe.color",
    "recipe.fg",
    "recipe.fgEstimated",
    "recipe.ibu",
    "recipe.name",
    "recipe.nutrition.calories.kJ",
    "recipe.og",
    "recipe.rbRatio",
    "recipe.style.name",
    "recipe.teaser",
    "status",
];

/// Batch status values as Brewfather spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrewfatherStatus {
    Planning,
    Brewing,
    Fermenting,
    Conditioning,
    Completed,
    Archived,
}

impl BrewfatherStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::Brewing => "Brewing",
            Self::Fermenting => "Fermenting",
            Self::Conditioning => "Conditioning",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
        }
    }

    fn from_brewfather_str(s: &str) -> Option<Self> {
        match s {
            "Planning" => Some(Self::Planning),
            "Brewing" => Some(Self::Brewing),
            "Fermenting" => Some(Self::Fermenting),
            "Conditioning" => Some(Self::Conditioning),
            "Completed" => Some(Self::Completed),
            "Archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Upstream statuses queried for a category, in request order.
    ///
    /// `Unknown` has no upstream counterpart and is never queried.
    pub fn tokens_for(status: BatchStatus) -> &'static [BrewfatherStatus] {
        match status {
            BatchStatus::Upcoming => &[Self::Planning],
            BatchStatus::Brewing => &[Self::Brewing, Self::Fermenting, Self::Conditioning],
            BatchStatus::Drinking => &[Self::Completed],
            BatchStatus::Archived => &[Self::Archived],
            BatchStatus::Unknown => &[],
        }
    }

    /// Collapse to the canonical category.
    pub fn to_batch_status(self) -> BatchStatus {
        match self {
            Self::Planning => BatchStatus::Upcoming,
            Self::Brewing | Self::Fermenting | Self::Conditioning => BatchStatus::Brewing,
            Self::Completed => BatchStatus::Drinking,
            Self::Archived => BatchStatus::Archived,
        }
    }
}

/// Normalize a raw upstream status; anything unrecognized becomes `Unknown`.
pub fn normalize_status(raw: Option<&str>) -> BatchStatus {
    raw.and_then(BrewfatherStatus::from_brewfather_str)
        .map_or(BatchStatus::Unknown, BrewfatherStatus::to_batch_status)
}

/// Map a carbonation type onto the way the batch is served.
pub fn normalize_package(raw: Option<&str>) -> Option<Package> {
    match raw? {
        "Sugar" => Some(Package::Bottle),
        "Keg (Force)" | "Keg (Sugar)" => Some(Package::Keg),
        _ => None,
    }
}

/// Pick a display name for a batch.
///
/// A custom name wins unless it is empty or still the default placeholder;
/// then the recipe name; then a label built from the batch number.
pub fn resolve_name(custom: Option<&str>, recipe: Option<&str>, number: Option<i64>) -> String {
    let non_empty = |s: &&str| !s.trim().is_empty();

    if let Some(name) = custom.filter(non_empty)
        && name != DEFAULT_BATCH_NAME
    {
        return name.to_owned();
    }
    if let Some(name) = recipe.filter(non_empty) {
        return name.to_owned();
    }
    match number {
        Some(n) => format!("{DEFAULT_BATCH_NAME} #{n}"),
        None => DEFAULT_BATCH_NAME.to_owned(),
    }
}

/// First tier that has a value: measured, then estimated, then recipe.
fn prefer<const N: usize>(tiers: [Option<f64>; N]) -> Option<f64> {
    tiers.into_iter().flatten().next()
}

/// A batch record as returned by `GET /v1/batches`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrewfatherBatch {
    #[serde(rename = "_id")]
    pub id: String,
    pub batch_no: Option<i64>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub brewer: Option<String>,
    pub brew_date: Option<i64>,
    pub bottling_date: Option<i64>,
    pub fermentation_start_date: Option<i64>,
    pub carbonation_type: Option<String>,

    pub measured_abv: Option<f64>,
    pub measured_og: Option<f64>,
    pub measured_fg: Option<f64>,
    pub measured_ibu: Option<f64>,
    pub measured_color: Option<f64>,
    pub measured_bu_gu_ratio: Option<f64>,
    pub measured_rb_ratio: Option<f64>,

    pub estimated_abv: Option<f64>,
    pub estimated_og: Option<f64>,
    pub estimated_fg: Option<f64>,
    pub estimated_ibu: Option<f64>,
    pub estimated_color: Option<f64>,
    pub estimated_bu_gu_ratio: Option<f64>,
    pub estimated_rb_ratio: Option<f64>,

    pub recipe: Option<BrewfatherRecipe>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrewfatherRecipe {
    pub name: Option<String>,
    pub abv: Option<f64>,
    pub og: Option<f64>,
    pub fg: Option<f64>,
    pub fg_estimated: Option<f64>,
    pub ibu: Option<f64>,
    pub color: Option<f64>,
    pub bu_gu_ratio: Option<f64>,
    pub rb_ratio: Option<f64>,
    pub teaser: Option<String>,
    pub style: Option<BrewfatherStyle>,
    pub nutrition: Option<BrewfatherNutrition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrewfatherStyle {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrewfatherNutrition {
    pub calories: Option<BrewfatherCalories>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrewfatherCalories {
    #[serde(rename = "kJ")]
    pub kj: Option<f64>,
}

impl From<BrewfatherBatch> for Batch {
    fn from(b: BrewfatherBatch) -> Self {
        let recipe = b.recipe.unwrap_or_default();

        Batch {
            status: normalize_status(b.status.as_deref()),
            name: resolve_name(b.name.as_deref(), recipe.name.as_deref(), b.batch_no),
            number: b.batch_no,
            brewer: b.brewer,
            abv: prefer([b.measured_abv, b.estimated_abv, recipe.abv]),
            og: prefer([b.measured_og, b.estimated_og, recipe.og]),
            fg: prefer([b.measured_fg, b.estimated_fg, recipe.fg, recipe.fg_estimated]),
            ibu: prefer([b.measured_ibu, b.estimated_ibu, recipe.ibu]),
            srm: prefer([b.measured_color, b.estimated_color, recipe.color]),
            bu_gu: prefer([
                b.measured_bu_gu_ratio,
                b.estimated_bu_gu_ratio,
                recipe.bu_gu_ratio,
            ]),
            rbr: prefer([b.measured_rb_ratio, b.estimated_rb_ratio, recipe.rb_ratio]),
            calories: recipe.nutrition.and_then(|n| n.calories).and_then(|c| c.kj),
            brewed: b.brew_date,
            packaged: b.bottling_date,
            pitched: b.fermentation_start_date,
            package: normalize_package(b.carbonation_type.as_deref()),
            style: recipe.style.and_then(|s| s.name),
            summary: recipe.teaser,
            source: SOURCE.to_owned(),
            source_id: b.id,
            tap: None,
        }
    }
}
