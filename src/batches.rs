//! Cache-aside access to batch listings.
//!
//! Reads check the cache store first and fall back to the upstream source on a
//! miss, writing non-empty results back. The refresh scheduler keeps entries
//! warm, so end-user reads are normally hits.
//!
//! Two concurrent misses for the same category may both fetch upstream and
//! both write the cache; the last write wins.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::brewfather::UpstreamError;
use crate::data::kv::{CacheError, CacheStore};
use crate::data::models::{Batch, BatchStatus, InvalidCategory};
use crate::utils::{fmt_duration, log_if_slow};

/// Order of categories on the tap list: what's pouring, then what's coming.
pub const TAP_LIST_ORDER: [BatchStatus; 3] = [
    BatchStatus::Drinking,
    BatchStatus::Brewing,
    BatchStatus::Upcoming,
];

/// Upstream fetches slower than this are logged as warnings.
const SLOW_UPSTREAM_THRESHOLD: Duration = Duration::from_secs(5);

/// Where batches come from when the cache has nothing.
#[async_trait]
pub trait BatchSource: Send + Sync {
    async fn fetch_batches(&self, status: BatchStatus) -> Result<Vec<Batch>, UpstreamError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error(transparent)]
    CacheUnavailable(#[from] CacheError),
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategory),
}

#[derive(Clone)]
pub struct BatchService {
    source: Arc<dyn BatchSource>,
    cache: Arc<dyn CacheStore>,
}

impl BatchService {
    pub fn new(source: Arc<dyn BatchSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self { source, cache }
    }

    /// Batches in one category, served from cache when present.
    ///
    /// A cached value that no longer deserializes is treated as a miss. Cache
    /// failures are returned as [`BatchError::CacheUnavailable`] rather than
    /// silently falling through to upstream.
    pub async fn get_batches(&self, status: BatchStatus) -> Result<Vec<Batch>, BatchError> {
        let key = status.cache_key();

        if let Some(raw) = self.cache.get(&key).await? {
            match serde_json::from_str::<Vec<Batch>>(&raw) {
                Ok(batches) => {
                    debug!(status = %status, count = batches.len(), "Fetched batches from cache");
                    return Ok(batches);
                }
                Err(e) => {
                    warn!(status = %status, error = %e, "Cached batches unreadable, refetching");
                }
            }
        }

        let start = Instant::now();
        let batches = self.source.fetch_batches(status).await?;
        log_if_slow(start, SLOW_UPSTREAM_THRESHOLD, "upstream batch fetch");
        debug!(
            status = %status,
            count = batches.len(),
            duration = fmt_duration(start.elapsed()),
            "Fetched batches from upstream"
        );

        if !batches.is_empty() {
            let raw = serde_json::to_string(&batches).map_err(|e| CacheError::Command {
                op: "SET",
                key: key.clone(),
                source: e.into(),
            })?;
            self.cache.set(&key, &raw).await?;
        }

        Ok(batches)
    }

    /// Concatenate several categories in the given order.
    pub async fn get_batches_in(&self, order: &[BatchStatus]) -> Result<Vec<Batch>, BatchError> {
        let mut all = Vec::new();
        for status in order {
            all.extend(self.get_batches(*status).await?);
        }
        Ok(all)
    }

    /// Every category, in [`BatchStatus::ALL`] order.
    pub async fn get_all_batches(&self) -> Result<Vec<Batch>, BatchError> {
        self.get_batches_in(&BatchStatus::ALL).await
    }

    /// Drop the cached listing for a category. Idempotent.
    pub async fn invalidate(&self, status: BatchStatus) -> Result<(), BatchError> {
        self.cache.delete(&status.cache_key()).await?;
        debug!(status = %status, "Invalidated batch cache");
        Ok(())
    }

    /// Drop every cached listing.
    pub async fn invalidate_all(&self) -> Result<(), BatchError> {
        for status in BatchStatus::ALL {
            self.invalidate(status).await?;
        }
        Ok(())
    }
}
