//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{trace, warn};
use ts_rs::TS;

use crate::data::kv;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize, TS)]
#[ts(export)]
pub struct ServiceInfo {
    name: String,
    status: ServiceStatus,
}

#[derive(Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    services: BTreeMap<String, ServiceInfo>,
    /// RFC 3339 time of the last refresh that covered every category.
    last_refresh: Option<String>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Status endpoint showing service and cache status
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status)| (name.clone(), ServiceInfo { name, status }))
        .collect();

    let cache_status = match state.cache.ping().await {
        Ok(()) => ServiceStatus::Connected,
        Err(e) => {
            warn!(error = ?e, "cache ping failed");
            ServiceStatus::Error
        }
    };
    services.insert(
        "cache".to_owned(),
        ServiceInfo {
            name: "cache".to_owned(),
            status: cache_status,
        },
    );

    let last_refresh = if matches!(cache_status, ServiceStatus::Error) {
        None
    } else {
        kv::get_timestamp(state.cache.as_ref(), kv::KV_BATCH_REFRESH)
            .await
            .ok()
            .flatten()
            .map(|ts| ts.to_rfc3339())
    };

    let overall = if services
        .values()
        .any(|s| matches!(s.status, ServiceStatus::Error))
    {
        ServiceStatus::Error
    } else {
        ServiceStatus::Active
    };

    Json(StatusResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        services,
        last_refresh,
    })
}
