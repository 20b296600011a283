//! HTTP API over an in-memory cache and a scripted source.

mod helpers;

use alewife::batches::BatchService;
use alewife::data::kv::{self, CacheStore};
use alewife::data::memory::MemoryCacheStore;
use alewife::data::models::BatchStatus;
use alewife::state::{AppState, ServiceStatus};
use alewife::web::create_router;
use chrono::{TimeZone, Utc};
use helpers::{FailingCacheStore, FakeSource, make_batch};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the router on an ephemeral port and return its base URL.
async fn serve(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn memory_state() -> (AppState, Arc<FakeSource>, MemoryCacheStore) {
    let source = Arc::new(FakeSource::new());
    let cache = MemoryCacheStore::new();
    let shared: Arc<dyn CacheStore> = Arc::new(cache.clone());
    let batches = BatchService::new(source.clone(), shared.clone());
    (AppState::new(batches, shared), source, cache)
}

#[tokio::test]
async fn tap_list_is_drinking_then_brewing_then_upcoming() {
    let (state, source, _cache) = memory_state();
    source.set_batches(
        BatchStatus::Upcoming,
        vec![make_batch("u", BatchStatus::Upcoming)],
    );
    source.set_batches(
        BatchStatus::Drinking,
        vec![make_batch("d", BatchStatus::Drinking)],
    );
    let base = serve(state).await;

    let body: Vec<Value> = reqwest::get(format!("{base}/batches"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = body.iter().map(|b| b["sourceId"].as_str().unwrap()).collect();
    assert_eq!(ids, ["d", "u"]);
}

#[tokio::test]
async fn category_lookup_is_case_insensitive() {
    let (state, source, _cache) = memory_state();
    source.set_batches(
        BatchStatus::Brewing,
        vec![make_batch("b", BatchStatus::Brewing)],
    );
    let base = serve(state).await;

    let response = reqwest::get(format!("{base}/batches/Brewing")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Vec<Value> = response.json().await.unwrap();
    assert_eq!(body[0]["status"], "brewing");
}

#[tokio::test]
async fn unknown_category_is_a_bad_request() {
    let (state, source, _cache) = memory_state();
    let base = serve(state).await;

    let response = reqwest::get(format!("{base}/batches/fermenting")).await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_CATEGORY");
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let (state, source, _cache) = memory_state();
    source.fail(BatchStatus::Archived);
    let base = serve(state).await;

    let response = reqwest::get(format!("{base}/batches/archived")).await.unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn unavailable_cache_maps_to_service_unavailable() {
    let source = Arc::new(FakeSource::new());
    let cache: Arc<dyn CacheStore> = Arc::new(FailingCacheStore);
    let state = AppState::new(BatchService::new(source, cache.clone()), cache);
    let base = serve(state).await;

    let response = reqwest::get(format!("{base}/batches/drinking")).await.unwrap();
    assert_eq!(response.status(), 503);

    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["services"]["cache"]["status"], "error");
    assert_eq!(status["status"], "error");
}

#[tokio::test]
async fn status_reports_services_cache_and_last_refresh() {
    let (state, _source, cache) = memory_state();
    state.service_statuses.set("refresh", ServiceStatus::Active);
    let base = serve(state).await;

    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "active");
    assert_eq!(status["services"]["cache"]["status"], "connected");
    assert_eq!(status["services"]["refresh"]["status"], "active");
    assert!(status["lastRefresh"].is_null());

    let refreshed_at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
    kv::set_timestamp(&cache, kv::KV_BATCH_REFRESH, refreshed_at)
        .await
        .unwrap();
    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["lastRefresh"], refreshed_at.to_rfc3339());
}

#[tokio::test]
async fn refresh_clears_caches_and_wakes_scheduler() {
    let (state, source, cache) = memory_state();
    source.set_batches(
        BatchStatus::Drinking,
        vec![make_batch("d", BatchStatus::Drinking)],
    );
    let trigger = state.refresh_trigger.clone();
    let base = serve(state).await;

    reqwest::get(format!("{base}/batches/drinking")).await.unwrap();
    assert!(cache.contains("batches:drinking"));

    let response = reqwest::Client::new()
        .post(format!("{base}/batches/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);
    assert!(!cache.contains("batches:drinking"));

    tokio::time::timeout(std::time::Duration::from_secs(1), trigger.notified())
        .await
        .expect("refresh should notify the scheduler");
}

#[tokio::test]
async fn taps_and_settings_round_trip() {
    let (state, _source, _cache) = memory_state();
    let base = serve(state).await;
    let client = reqwest::Client::new();

    let taps: Value = reqwest::get(format!("{base}/taps")).await.unwrap().json().await.unwrap();
    assert_eq!(taps, json!([]));
    let settings: Value = reqwest::get(format!("{base}/settings"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(settings, json!({}));

    let new_taps = json!([{"tap": 1, "batch": "d"}]);
    let response = client
        .put(format!("{base}/taps"))
        .json(&new_taps)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let taps: Value = reqwest::get(format!("{base}/taps")).await.unwrap().json().await.unwrap();
    assert_eq!(taps, new_taps);
}

#[tokio::test]
async fn health_reports_healthy() {
    let (state, _source, _cache) = memory_state();
    let base = serve(state).await;

    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
}
