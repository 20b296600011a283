//! Application state shared across components (web, refresh scheduler).

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Notify;
use ts_rs::TS;

use crate::batches::BatchService;
use crate::data::kv::CacheStore;

/// Health status of a service.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ServiceStatus {
    Starting,
    Active,
    Connected,
    Disabled,
    Error,
}

/// Thread-safe registry for services to self-report their health status.
#[derive(Debug, Clone, Default)]
pub struct ServiceStatusRegistry {
    inner: Arc<DashMap<String, ServiceStatus>>,
}

impl ServiceStatusRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the status for a named service.
    pub fn set(&self, name: &str, status: ServiceStatus) {
        self.inner.insert(name.to_owned(), status);
    }

    /// Returns a snapshot of all service statuses, sorted by name.
    pub fn all(&self) -> Vec<(String, ServiceStatus)> {
        let mut all: Vec<_> = self
            .inner
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[derive(Clone)]
pub struct AppState {
    pub batches: BatchService,
    pub cache: Arc<dyn CacheStore>,
    pub service_statuses: ServiceStatusRegistry,
    /// Wakes the refresh scheduler for an immediate tick.
    pub refresh_trigger: Arc<Notify>,
}

impl AppState {
    pub fn new(batches: BatchService, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            batches,
            cache,
            service_statuses: ServiceStatusRegistry::new(),
            refresh_trigger: Arc::new(Notify::new()),
        }
    }
}
