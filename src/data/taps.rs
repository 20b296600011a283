//! Tap assignments, stored verbatim for the frontend.

use serde_json::Value;
use tracing::debug;

use crate::data::kv::{self, CacheError, CacheStore};

const KEY: &str = "taps";

/// Retrieve the tap list, or an empty array if none has been saved.
pub async fn get(store: &dyn CacheStore) -> Result<Value, CacheError> {
    let taps = kv::get_json_or(store, KEY, Value::Array(Vec::new())).await?;
    debug!("Fetched taps from cache");
    Ok(taps)
}

/// Replace the tap list. `null` is stored as an empty array.
pub async fn set(store: &dyn CacheStore, taps: &Value) -> Result<(), CacheError> {
    let empty = Value::Array(Vec::new());
    let taps = if taps.is_null() { &empty } else { taps };
    kv::set_json(store, KEY, taps).await?;
    debug!("Saved taps to cache");
    Ok(())
}
