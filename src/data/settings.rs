//! Display settings, stored verbatim for the frontend.

use serde_json::{Map, Value};
use tracing::debug;

use crate::data::kv::{self, CacheError, CacheStore};

const KEY: &str = "settings";

/// Retrieve the settings object, or an empty object if none has been saved.
pub async fn get(store: &dyn CacheStore) -> Result<Value, CacheError> {
    let settings = kv::get_json_or(store, KEY, Value::Object(Map::new())).await?;
    debug!("Fetched settings from cache");
    Ok(settings)
}

/// Replace the settings object. `null` is stored as an empty object.
pub async fn set(store: &dyn CacheStore, settings: &Value) -> Result<(), CacheError> {
    let empty = Value::Object(Map::new());
    let settings = if settings.is_null() { &empty } else { settings };
    kv::set_json(store, KEY, settings).await?;
    debug!("Saved settings to cache");
    Ok(())
}
