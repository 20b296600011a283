//! Tap and settings pass-through handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::Value;

use crate::data::{settings, taps};
use crate::state::AppState;
use crate::web::error::ApiError;

pub(super) async fn get_taps(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(taps::get(state.cache.as_ref()).await?))
}

pub(super) async fn put_taps(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    taps::set(state.cache.as_ref(), &body).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn get_settings(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(settings::get(state.cache.as_ref()).await?))
}

pub(super) async fn put_settings(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<StatusCode, ApiError> {
    settings::set(state.cache.as_ref(), &body).await?;
    Ok(StatusCode::NO_CONTENT)
}
