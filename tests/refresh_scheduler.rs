//! Refresh ticks and the scheduler loop.

mod helpers;

use alewife::batches::BatchService;
use alewife::data::kv::{self, CacheStore};
use alewife::data::memory::MemoryCacheStore;
use alewife::data::models::BatchStatus;
use alewife::refresh::scheduler::RefreshScheduler;
use helpers::{FakeSource, make_batch, memory_service, wait_for};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn tick_invalidates_then_repopulates_every_category() {
    let (service, source, cache) = memory_service();
    source.set_batches(
        BatchStatus::Drinking,
        vec![make_batch("old", BatchStatus::Drinking)],
    );
    service.get_batches(BatchStatus::Drinking).await.unwrap();

    source.set_batches(
        BatchStatus::Drinking,
        vec![make_batch("new", BatchStatus::Drinking)],
    );
    let report = RefreshScheduler::tick(&service, &CancellationToken::new()).await;

    assert!(report.is_complete());
    assert_eq!(report.refreshed_statuses(), BatchStatus::ALL.to_vec());
    let cached = service.get_batches(BatchStatus::Drinking).await.unwrap();
    assert_eq!(cached[0].source_id, "new");
    assert!(cache.contains("batches:drinking"));
}

#[tokio::test]
async fn one_failing_category_does_not_stop_the_others() {
    let (service, source, cache) = memory_service();
    source.set_batches(
        BatchStatus::Upcoming,
        vec![make_batch("u", BatchStatus::Upcoming)],
    );
    source.set_batches(
        BatchStatus::Brewing,
        vec![make_batch("b", BatchStatus::Brewing)],
    );
    source.set_batches(
        BatchStatus::Drinking,
        vec![make_batch("d", BatchStatus::Drinking)],
    );
    service.get_batches(BatchStatus::Drinking).await.unwrap();
    source.fail(BatchStatus::Drinking);

    let report = RefreshScheduler::tick(&service, &CancellationToken::new()).await;

    assert_eq!(report.failed, vec![BatchStatus::Drinking]);
    assert!(!report.is_complete());
    assert!(cache.contains("batches:upcoming"));
    assert!(cache.contains("batches:brewing"));
    // Invalidated before the failed fetch, so the next read goes upstream
    assert!(!cache.contains("batches:drinking"));
}

#[tokio::test]
async fn cancelled_token_skips_every_category() {
    let (service, source, _cache) = memory_service();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = RefreshScheduler::tick(&service, &cancel).await;

    assert!(report.cancelled);
    assert!(report.refreshed.is_empty());
    assert_eq!(source.call_count(), 0);
}

#[tokio::test]
async fn run_ticks_immediately_and_records_completion() {
    let (service, source, cache) = memory_service();
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache.clone()),
        Duration::from_secs(3600),
        Arc::new(Notify::new()),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    assert!(wait_for(Duration::from_secs(2), || source.call_count() == BatchStatus::ALL.len()).await);
    assert!(wait_for(Duration::from_secs(2), || cache.contains(kv::KV_BATCH_REFRESH)).await);
    let last = kv::get_timestamp(&cache, kv::KV_BATCH_REFRESH).await.unwrap();
    assert!(last.is_some());

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler should exit on shutdown")
        .unwrap();
}

#[tokio::test]
async fn failed_tick_does_not_record_completion() {
    let (service, source, cache) = memory_service();
    source.fail(BatchStatus::Brewing);
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache.clone()),
        Duration::from_secs(3600),
        Arc::new(Notify::new()),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    assert!(wait_for(Duration::from_secs(2), || source.call_count() == BatchStatus::ALL.len()).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!cache.contains(kv::KV_BATCH_REFRESH));

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn manual_trigger_runs_another_tick() {
    let (service, source, cache) = memory_service();
    let trigger = Arc::new(Notify::new());
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache.clone()),
        Duration::from_secs(3600),
        trigger.clone(),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let per_tick = BatchStatus::ALL.len();
    assert!(wait_for(Duration::from_secs(2), || cache.contains(kv::KV_BATCH_REFRESH)).await);
    // Let the first tick's task finish so the trigger is not skipped as an overlap
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(source.call_count(), per_tick);

    trigger.notify_one();
    assert!(wait_for(Duration::from_secs(2), || source.call_count() == per_tick * 2).await);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let source = Arc::new(FakeSource::with_delay(Duration::from_millis(40)));
    let cache = MemoryCacheStore::new();
    let service = BatchService::new(source.clone(), Arc::new(cache.clone()));
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache),
        Duration::from_millis(10),
        Arc::new(Notify::new()),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    // One tick takes ~200ms; a 10ms interval would start many more if they overlapped
    tokio::time::sleep(Duration::from_millis(120)).await;
    let calls = source.call_count();
    assert!(calls <= BatchStatus::ALL.len(), "ticks overlapped: {calls} calls");

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_cancels_in_flight_tick_between_categories() {
    let source = Arc::new(FakeSource::with_delay(Duration::from_millis(50)));
    let cache = MemoryCacheStore::new();
    let service = BatchService::new(source.clone(), Arc::new(cache.clone()));
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache.clone()),
        Duration::from_secs(3600),
        Arc::new(Notify::new()),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    assert!(wait_for(Duration::from_secs(2), || source.call_count() >= 1).await);
    shutdown_tx.send(()).unwrap();
    handle.await.unwrap();

    assert!(source.call_count() < BatchStatus::ALL.len());
    assert!(cache.get(kv::KV_BATCH_REFRESH).await.unwrap().is_none());
}

#[tokio::test]
async fn panicking_tick_does_not_stop_the_scheduler() {
    let (service, source, cache) = memory_service();
    source.panic_on(BatchStatus::Upcoming);
    let scheduler = RefreshScheduler::new(
        service,
        Arc::new(cache),
        Duration::from_millis(10),
        Arc::new(Notify::new()),
    );
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    // Each tick panics on its first category, so every call is a separate tick
    assert!(wait_for(Duration::from_secs(2), || source.call_count() >= 3).await);

    shutdown_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("scheduler should exit on shutdown")
        .unwrap();
}
