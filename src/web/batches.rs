//! Batch listing handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::{info, instrument};

use crate::batches::TAP_LIST_ORDER;
use crate::data::models::{Batch, BatchStatus};
use crate::state::AppState;
use crate::web::error::ApiError;

/// `GET /api/batches` -- drinking, then brewing, then upcoming.
#[instrument(skip_all)]
pub(super) async fn list_batches(
    State(state): State<AppState>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    let batches = state.batches.get_batches_in(&TAP_LIST_ORDER).await?;
    Ok(Json(batches))
}

/// `GET /api/batches/{status}` -- one category.
#[instrument(skip_all)]
pub(super) async fn list_batches_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Batch>>, ApiError> {
    let status: BatchStatus = status.parse().map_err(crate::batches::BatchError::from)?;
    let batches = state.batches.get_batches(status).await?;
    Ok(Json(batches))
}

/// `POST /api/batches/refresh` -- drop every cached listing and wake the scheduler.
#[instrument(skip_all)]
pub(super) async fn refresh_batches(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.batches.invalidate_all().await?;
    state.refresh_trigger.notify_one();
    info!("batch caches invalidated, refresh requested");
    Ok(StatusCode::ACCEPTED)
}
