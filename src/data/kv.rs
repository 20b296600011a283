//! Generic key-value persistence for cached batch lists and small app state.
//!
//! Backed by Redis in production (see [`crate::data::redis`]) and by an
//! in-process map for `memory://` URLs. Keys are plain strings; values are
//! plain strings, usually JSON.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Key holding the completion time of the last scheduled refresh.
pub const KV_BATCH_REFRESH: &str = "scheduler.batch_refresh";

/// The cache store could not be reached or did not answer in time.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unavailable: failed to connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cache unavailable: {op} failed for key {key:?}")]
    Command {
        op: &'static str,
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("cache unavailable: {op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
}

/// String-keyed store shared by every service in the process.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieve a value by key, or `None` if not present.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Insert or overwrite a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Retrieve a persisted UTC timestamp, or `None` if absent or unparseable.
pub async fn get_timestamp(
    store: &dyn CacheStore,
    key: &str,
) -> Result<Option<DateTime<Utc>>, CacheError> {
    let value = store.get(key).await?;
    Ok(value.and_then(|v| DateTime::parse_from_rfc3339(&v).ok().map(|dt| dt.to_utc())))
}

/// Persist a UTC timestamp under the given key.
pub async fn set_timestamp(
    store: &dyn CacheStore,
    key: &str,
    ts: DateTime<Utc>,
) -> Result<(), CacheError> {
    store.set(key, &ts.to_rfc3339()).await
}

/// Retrieve a JSON value, falling back to `default` when absent or unparseable.
pub async fn get_json_or<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
    default: T,
) -> Result<T, CacheError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(default);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unparseable cached value");
            Ok(default)
        }
    }
}

/// Serialize a value as JSON and store it.
pub async fn set_json<T: Serialize + Sync>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string(value).map_err(|e| CacheError::Command {
        op: "SET",
        key: key.to_owned(),
        source: e.into(),
    })?;
    store.set(key, &raw).await
}
