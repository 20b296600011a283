use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::batches::BatchService;
use crate::data::kv::{self, CacheStore};
use crate::data::models::BatchStatus;
use crate::utils::fmt_duration;

/// How long shutdown waits for an in-flight tick before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Outcome of one pass over every category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Categories repopulated, with the number of batches now cached.
    pub refreshed: Vec<(BatchStatus, usize)>,
    /// Categories whose invalidate or repopulate step failed.
    pub failed: Vec<BatchStatus>,
    /// Set when cancellation stopped the tick before every category ran.
    pub cancelled: bool,
}

impl TickReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed.is_empty()
    }

    pub fn refreshed_statuses(&self) -> Vec<BatchStatus> {
        self.refreshed.iter().map(|(status, _)| *status).collect()
    }
}

/// Periodically invalidates and repopulates the batch cache.
///
/// Ticks never overlap: if the previous tick is still running when the next is
/// due, the new one is skipped.
pub struct RefreshScheduler {
    batches: BatchService,
    cache: Arc<dyn CacheStore>,
    interval: Duration,
    trigger: Arc<Notify>,
}

impl RefreshScheduler {
    pub fn new(
        batches: BatchService,
        cache: Arc<dyn CacheStore>,
        interval: Duration,
        trigger: Arc<Notify>,
    ) -> Self {
        Self {
            batches,
            cache,
            interval,
            trigger,
        }
    }

    /// Runs the scheduler's main loop until a shutdown signal arrives.
    ///
    /// The first tick runs immediately. Each tick runs in its own task with a
    /// fresh [`CancellationToken`]; on shutdown the token is cancelled and the
    /// tick gets [`SHUTDOWN_GRACE`] to finish the category it is on.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval = fmt_duration(self.interval),
            "Refresh scheduler started"
        );

        let mut next_run = time::Instant::now();
        let mut current: Option<(JoinHandle<TickReport>, CancellationToken)> = None;

        loop {
            tokio::select! {
                _ = self.trigger.notified() => {
                    info!("Batch refresh triggered manually");
                    next_run = time::Instant::now();
                    continue;
                }
                _ = time::sleep_until(next_run) => {
                    next_run = time::Instant::now() + self.interval;

                    if let Some((ref handle, _)) = current
                        && !handle.is_finished()
                    {
                        trace!("Previous refresh still running, skipping");
                        continue;
                    }
                    if let Some((handle, _)) = current.take() {
                        join_tick(handle).await;
                    }

                    let cancel = CancellationToken::new();
                    let handle = tokio::spawn({
                        let batches = self.batches.clone();
                        let cache = self.cache.clone();
                        let cancel = cancel.clone();
                        async move {
                            let report = Self::tick(&batches, &cancel).await;
                            if report.is_complete()
                                && let Err(e) = kv::set_timestamp(cache.as_ref(), kv::KV_BATCH_REFRESH, Utc::now()).await
                            {
                                warn!(error = ?e, "Failed to persist refresh timestamp");
                            }
                            report
                        }
                    });
                    current = Some((handle, cancel));
                }
                _ = shutdown_rx.recv() => {
                    info!("Refresh scheduler received shutdown signal");

                    if let Some((handle, cancel)) = current.take() {
                        cancel.cancel();
                        if time::timeout(SHUTDOWN_GRACE, join_tick(handle)).await.is_err() {
                            warn!("Refresh did not complete within {}s, abandoning", SHUTDOWN_GRACE.as_secs());
                        } else {
                            trace!("Refresh completed gracefully");
                        }
                    }

                    info!("Refresh scheduler exiting gracefully");
                    break;
                }
            }
        }
    }

    /// Invalidate then repopulate every category, in [`BatchStatus::ALL`] order.
    ///
    /// Invalidating first means a failed repopulate leaves the category empty,
    /// so the next read goes upstream instead of serving stale data. A failure
    /// in one category is logged and the rest still run. The token is checked
    /// before each category; an upstream call already in flight is not aborted.
    pub async fn tick(batches: &BatchService, cancel: &CancellationToken) -> TickReport {
        let start = Instant::now();
        let mut report = TickReport::default();

        for status in BatchStatus::ALL {
            if cancel.is_cancelled() {
                trace!(status = %status, "Refresh cancelled before category");
                report.cancelled = true;
                break;
            }

            if let Err(e) = batches.invalidate(status).await {
                error!(status = %status, error = ?e, "Failed to invalidate batch cache");
                report.failed.push(status);
                continue;
            }

            match batches.get_batches(status).await {
                Ok(fetched) => report.refreshed.push((status, fetched.len())),
                Err(e) => {
                    error!(status = %status, error = ?e, "Failed to refresh batches");
                    report.failed.push(status);
                }
            }
        }

        let total: usize = report.refreshed.iter().map(|(_, n)| n).sum();
        if report.failed.is_empty() {
            info!(
                batches = total,
                cancelled = report.cancelled,
                duration = fmt_duration(start.elapsed()),
                "Batch refresh completed"
            );
        } else {
            warn!(
                batches = total,
                failed = ?report.failed,
                cancelled = report.cancelled,
                duration = fmt_duration(start.elapsed()),
                "Batch refresh completed with failures"
            );
        }

        report
    }
}

/// Collect a tick's report, logging it if the task panicked or was aborted.
async fn join_tick(handle: JoinHandle<TickReport>) -> Option<TickReport> {
    match handle.await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(error = ?e, "Refresh task failed");
            None
        }
    }
}
