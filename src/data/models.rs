//! Canonical batch models shared by the upstream client, the cache and the web API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// Lifecycle stage of a batch, independent of any upstream vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BatchStatus {
    Upcoming,
    Brewing,
    Drinking,
    Archived,
    Unknown,
}

impl BatchStatus {
    /// Every category, in declaration order.
    pub const ALL: [BatchStatus; 5] = [
        BatchStatus::Upcoming,
        BatchStatus::Brewing,
        BatchStatus::Drinking,
        BatchStatus::Archived,
        BatchStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Brewing => "brewing",
            Self::Drinking => "drinking",
            Self::Archived => "archived",
            Self::Unknown => "unknown",
        }
    }

    /// Cache key holding the serialized batch list for this category.
    pub fn cache_key(self) -> String {
        format!("batches:{}", self.as_str().to_lowercase())
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status category string that does not name any [`BatchStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized batch status category: {0:?}")]
pub struct InvalidCategory(pub String);

impl FromStr for BatchStatus {
    type Err = InvalidCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| InvalidCategory(s.to_owned()))
    }
}

/// How a batch was packaged, derived from the upstream carbonation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Package {
    Bottle,
    Keg,
}

/// A single brewing run, normalized from the upstream record.
///
/// This is the shape stored in the cache and returned by the API.
/// Dates are epoch milliseconds as reported upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Batch {
    pub source_id: String,
    pub source: String,
    pub status: BatchStatus,
    pub name: String,
    #[ts(type = "number | null")]
    pub number: Option<i64>,
    pub brewer: Option<String>,
    pub abv: Option<f64>,
    pub og: Option<f64>,
    pub fg: Option<f64>,
    pub ibu: Option<f64>,
    pub srm: Option<f64>,
    pub bu_gu: Option<f64>,
    pub rbr: Option<f64>,
    pub calories: Option<f64>,
    #[ts(type = "number | null")]
    pub brewed: Option<i64>,
    #[ts(type = "number | null")]
    pub packaged: Option<i64>,
    #[ts(type = "number | null")]
    pub pitched: Option<i64>,
    pub package: Option<Package>,
    pub style: Option<String>,
    pub summary: Option<String>,
    pub tap: Option<String>,
}
