//! Web API router construction.

use axum::Router;
use axum::routing::{get, post};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::web::{batches, preferences, status};

/// Longest an API request may run, including an upstream fetch on a cache miss.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/batches", get(batches::list_batches))
        .route("/batches/refresh", post(batches::refresh_batches))
        .route("/batches/{status}", get(batches::list_batches_by_status))
        .route(
            "/taps",
            get(preferences::get_taps).put(preferences::put_taps),
        )
        .route(
            "/settings",
            get(preferences::get_settings).put(preferences::put_settings),
        )
        .with_state(app_state);

    // The frontend is served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api_router)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
