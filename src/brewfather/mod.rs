//! Brewfather API client for batch listings.

pub mod errors;
pub mod json;
pub mod models;

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

pub use errors::UpstreamError;
pub use models::{BrewfatherBatch, BrewfatherStatus};

use crate::batches::BatchSource;
use crate::data::models::{Batch, BatchStatus};
use crate::utils::fmt_duration;

/// Public Brewfather API root.
pub const DEFAULT_BASE_URL: &str = "https://api.brewfather.app/v1";

const BATCHES_RESOURCE: &str = "batches";

/// Longest response body kept in a [`UpstreamError::BadStatus`].
const ERROR_BODY_LIMIT: usize = 512;

/// Credentials are optional here so a missing value surfaces on first fetch,
/// not while the application is starting.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub user_id: Option<String>,
    pub api_key: Option<String>,
}

/// Client for the Brewfather batches endpoint.
pub struct BrewfatherClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl BrewfatherClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alewife/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    /// Fetch and normalize every batch in a category.
    ///
    /// One request per upstream status token, issued sequentially; results are
    /// concatenated in token order. `Unknown` makes no requests.
    pub async fn get_batches(&self, status: BatchStatus) -> Result<Vec<Batch>, UpstreamError> {
        let tokens = BrewfatherStatus::tokens_for(status);
        if tokens.is_empty() {
            trace!(status = %status, "No upstream statuses for category");
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        for token in tokens {
            let records = self.get_batches_by_token(*token).await?;
            batches.extend(records.into_iter().map(Batch::from));
        }
        Ok(batches)
    }

    /// Fetch raw records for one upstream status.
    async fn get_batches_by_token(
        &self,
        token: BrewfatherStatus,
    ) -> Result<Vec<BrewfatherBatch>, UpstreamError> {
        let (user_id, api_key) = self.credentials()?;
        let url = format!("{}/{BATCHES_RESOURCE}", self.base_url);
        let include = models::INCLUDE_FIELDS.join(",");
        let start = Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("status", token.as_str()),
                ("include", include.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "application/json")
            .basic_auth(user_id, Some(api_key))
            .send()
            .await
            .map_err(|source| UpstreamError::RequestFailed {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| UpstreamError::RequestFailed {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(UpstreamError::BadStatus {
                status: status.as_u16(),
                url,
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        let records: Vec<BrewfatherBatch> = json::parse_json_with_context(&body)
            .map_err(|source| UpstreamError::ParseFailed {
                url: url.clone(),
                source,
            })?;

        debug!(
            status = token.as_str(),
            count = records.len(),
            duration = fmt_duration(start.elapsed()),
            "Fetched batches from Brewfather"
        );
        Ok(records)
    }

    fn credentials(&self) -> Result<(&str, &str), UpstreamError> {
        let user_id = self
            .credentials
            .user_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(UpstreamError::MissingCredentials("BREWFATHER_USER_ID"))?;
        let api_key = self
            .credentials
            .api_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(UpstreamError::MissingCredentials("BREWFATHER_API_KEY"))?;
        Ok((user_id, api_key))
    }
}

#[async_trait]
impl BatchSource for BrewfatherClient {
    async fn fetch_batches(&self, status: BatchStatus) -> Result<Vec<Batch>, UpstreamError> {
        self.get_batches(status).await
    }
}

fn truncate(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_owned(),
    }
}
