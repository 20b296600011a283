use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::services::{Service, ServiceResult, run_service};
use crate::utils::fmt_duration;

/// Owns registered services, spawns them and coordinates their shutdown.
pub struct ServiceManager {
    registered: Vec<(String, Box<dyn Service>)>,
    running: JoinSet<(String, ServiceResult)>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: Vec::new(),
            running: JoinSet::new(),
            shutdown_tx,
        }
    }

    /// Register a service to be started by [`spawn_all`](Self::spawn_all).
    pub fn register_service(&mut self, name: &str, service: Box<dyn Service>) {
        trace!(service = name, "service registered");
        self.registered.push((name.to_owned(), service));
    }

    pub fn has_services(&self) -> bool {
        !self.registered.is_empty() || !self.running.is_empty()
    }

    /// Spawn every registered service on its own task.
    pub fn spawn_all(&mut self) {
        let names: Vec<String> = self.registered.iter().map(|(n, _)| n.clone()).collect();
        for (name, service) in self.registered.drain(..) {
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.running
                .spawn(async move { (name, run_service(service, shutdown_rx).await) });
        }
        debug!(services = ?names, "spawned all services");
    }

    /// Wait until any running service exits on its own.
    ///
    /// Pends forever when nothing is running so it can sit in a `select!`.
    pub async fn run(&mut self) -> (String, ServiceResult) {
        loop {
            match self.running.join_next().await {
                Some(Ok(outcome)) => return outcome,
                Some(Err(e)) => {
                    warn!(error = ?e, "service task panicked or was aborted");
                    return ("unknown".to_owned(), ServiceResult::Error(e.into()));
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Signal every service to stop and wait up to `timeout` for them.
    ///
    /// Returns the elapsed time on success, or the number of services that
    /// were still running when the timeout expired (these are aborted).
    pub async fn shutdown(&mut self, timeout: Duration) -> Result<Duration, usize> {
        let start = Instant::now();
        // No receivers left is fine: every service already exited.
        let _ = self.shutdown_tx.send(());

        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = self.running.join_next().await {
                match joined {
                    Ok((name, ServiceResult::Error(e))) => {
                        warn!(service = %name, error = ?e, "service stopped with error");
                    }
                    Ok((name, result)) => trace!(service = %name, ?result, "service stopped"),
                    Err(e) => warn!(error = ?e, "service task failed during shutdown"),
                }
            }
        })
        .await;

        match drained {
            Ok(()) => {
                info!(
                    duration = fmt_duration(start.elapsed()),
                    "all services shut down"
                );
                Ok(start.elapsed())
            }
            Err(_) => {
                let pending = self.running.len();
                self.running.abort_all();
                Err(pending)
            }
        }
    }
}
