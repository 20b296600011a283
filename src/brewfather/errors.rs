//! Error types for the Brewfather API client.

/// Failure talking to the upstream batch-tracking API.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Brewfather credentials are not configured (missing {0})")]
    MissingCredentials(&'static str),
    #[error("Brewfather request failed: {url}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Brewfather returned {status} for {url}: {body}")]
    BadStatus {
        status: u16,
        url: String,
        body: String,
    },
    #[error("Failed to parse Brewfather response from {url}")]
    ParseFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}
