//! Standardized API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};
use ts_rs::TS;

use crate::batches::BatchError;
use crate::data::kv::CacheError;

/// Machine-readable error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ApiErrorCode {
    UpstreamError,
    CacheUnavailable,
    InvalidCategory,
}

impl ApiErrorCode {
    fn status(self) -> StatusCode {
        match self {
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::CacheUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidCategory => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Upstream(e) => {
                error!(error = ?e, "upstream request failed");
                Self::new(ApiErrorCode::UpstreamError, "Batch data source is unavailable")
            }
            BatchError::CacheUnavailable(e) => e.into(),
            BatchError::InvalidCategory(e) => {
                warn!(error = %e, "rejected batch category");
                Self::new(ApiErrorCode::InvalidCategory, e.to_string())
            }
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        error!(error = ?err, "cache unavailable");
        Self::new(ApiErrorCode::CacheUnavailable, "Cache is unavailable")
    }
}
