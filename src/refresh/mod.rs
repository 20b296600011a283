//! Background batch cache refresh.

pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::batches::BatchService;
use crate::data::kv::CacheStore;
use crate::services::Service;
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use scheduler::RefreshScheduler;

/// Runs the [`RefreshScheduler`] as a managed service.
pub struct RefreshService {
    batches: BatchService,
    cache: Arc<dyn CacheStore>,
    interval: Duration,
    trigger: Arc<Notify>,
    service_statuses: ServiceStatusRegistry,
    shutdown_tx: Option<broadcast::Sender<()>>,
    scheduler: Option<JoinHandle<()>>,
}

impl RefreshService {
    pub fn new(
        batches: BatchService,
        cache: Arc<dyn CacheStore>,
        interval: Duration,
        trigger: Arc<Notify>,
        service_statuses: ServiceStatusRegistry,
    ) -> Self {
        Self {
            batches,
            cache,
            interval,
            trigger,
            service_statuses,
            shutdown_tx: None,
            scheduler: None,
        }
    }
}

#[async_trait::async_trait]
impl Service for RefreshService {
    fn name(&self) -> &'static str {
        "refresh"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let scheduler = RefreshScheduler::new(
            self.batches.clone(),
            self.cache.clone(),
            self.interval,
            self.trigger.clone(),
        );
        self.scheduler = Some(tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        }));
        self.service_statuses
            .set(self.name(), ServiceStatus::Active);

        if let Some(handle) = self.scheduler.as_mut() {
            let result = handle.await;
            self.scheduler = None;
            result?;
        }
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        } else {
            warn!("no shutdown channel found for refresh service");
        }
        if let Some(handle) = self.scheduler.take() {
            handle.await?;
        }
        self.service_statuses
            .set(self.name(), ServiceStatus::Disabled);
        Ok(())
    }
}
