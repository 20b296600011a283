//! Long-running services and their lifecycle.

use tokio::sync::broadcast;
use tracing::{error, info, warn};

pub mod manager;
pub mod signals;
pub mod web;

/// A component that runs until it finishes or is told to stop.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    /// The name of the service for logging
    fn name(&self) -> &'static str;

    /// Run the service's main work loop
    async fn run(&mut self) -> Result<(), anyhow::Error>;

    /// Gracefully shutdown the service
    ///
    /// Called after `run` has been interrupted; should release resources and
    /// wait for any background work the service spawned.
    async fn shutdown(&mut self) -> Result<(), anyhow::Error>;
}

/// How a service task ended.
#[derive(Debug)]
pub enum ServiceResult {
    GracefulShutdown,
    NormalCompletion,
    Error(anyhow::Error),
}

/// Drive a service until it returns or a shutdown signal arrives.
pub async fn run_service(
    mut service: Box<dyn Service>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> ServiceResult {
    let name = service.name();
    info!(service = name, "service started");

    tokio::select! {
        result = service.run() => {
            match result {
                Ok(()) => {
                    warn!(service = name, "service completed unexpectedly");
                    ServiceResult::NormalCompletion
                }
                Err(e) => {
                    error!(service = name, error = ?e, "service failed");
                    ServiceResult::Error(e)
                }
            }
        }
        _ = shutdown_rx.recv() => {
            info!(service = name, "shutting down service");
            match service.shutdown().await {
                Ok(()) => {
                    info!(service = name, "service shutdown completed");
                    ServiceResult::GracefulShutdown
                }
                Err(e) => {
                    error!(service = name, error = ?e, "service shutdown failed");
                    ServiceResult::Error(e)
                }
            }
        }
    }
}
