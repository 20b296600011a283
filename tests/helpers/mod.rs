#![allow(dead_code)]

use alewife::batches::{BatchService, BatchSource};
use alewife::brewfather::UpstreamError;
use alewife::data::kv::{CacheError, CacheStore};
use alewife::data::memory::MemoryCacheStore;
use alewife::data::models::{Batch, BatchStatus};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Build a minimal normalized batch.
pub fn make_batch(id: &str, status: BatchStatus) -> Batch {
    Batch {
        source_id: id.to_owned(),
        source: "brewfather".to_owned(),
        status,
        name: format!("Batch {id}"),
        number: None,
        brewer: None,
        abv: Some(5.2),
        og: None,
        fg: None,
        ibu: None,
        srm: None,
        bu_gu: None,
        rbr: None,
        calories: None,
        brewed: None,
        packaged: None,
        pitched: None,
        package: None,
        style: None,
        summary: None,
        tap: None,
    }
}

/// Scripted [`BatchSource`] that records every call.
#[derive(Default)]
pub struct FakeSource {
    batches: Mutex<HashMap<BatchStatus, Vec<Batch>>>,
    failing: Mutex<HashSet<BatchStatus>>,
    panicking: Mutex<HashSet<BatchStatus>>,
    calls: Mutex<Vec<BatchStatus>>,
    delay: Option<Duration>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each fetch sleeps this long before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_batches(&self, status: BatchStatus, batches: Vec<Batch>) {
        self.batches.lock().unwrap().insert(status, batches);
    }

    pub fn fail(&self, status: BatchStatus) {
        self.failing.lock().unwrap().insert(status);
    }

    /// Fetches for `status` panic instead of returning.
    pub fn panic_on(&self, status: BatchStatus) {
        self.panicking.lock().unwrap().insert(status);
    }

    pub fn calls(&self) -> Vec<BatchStatus> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, status: BatchStatus) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == status)
            .count()
    }
}

#[async_trait]
impl BatchSource for FakeSource {
    async fn fetch_batches(&self, status: BatchStatus) -> Result<Vec<Batch>, UpstreamError> {
        self.calls.lock().unwrap().push(status);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panicking.lock().unwrap().contains(&status) {
            panic!("fetch for {status} panicked");
        }
        if self.failing.lock().unwrap().contains(&status) {
            return Err(UpstreamError::BadStatus {
                status: 503,
                url: format!("http://fake/batches?status={status}"),
                body: "unavailable".to_owned(),
            });
        }
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(&status)
            .cloned()
            .unwrap_or_default())
    }
}

/// Cache store whose every operation times out.
pub struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(timeout("GET"))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), CacheError> {
        Err(timeout("SET"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(timeout("DEL"))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(timeout("PING"))
    }
}

fn timeout(op: &'static str) -> CacheError {
    CacheError::Timeout {
        op,
        timeout: Duration::from_millis(10),
    }
}

/// A service over a fake source and a fresh in-memory cache.
pub fn memory_service() -> (BatchService, Arc<FakeSource>, MemoryCacheStore) {
    let source = Arc::new(FakeSource::new());
    let cache = MemoryCacheStore::new();
    let service = BatchService::new(source.clone(), Arc::new(cache.clone()));
    (service, source, cache)
}

/// Poll `condition` every few milliseconds until it holds or `within` elapses.
pub async fn wait_for(within: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
