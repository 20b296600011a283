//! Redis-backed cache store.
//!
//! One multiplexed connection per store, opened on first use and shared by all
//! callers. Concurrent first callers await the same connection attempt; a
//! failed attempt leaves the slot empty so the next operation tries again.

use anyhow::anyhow;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::data::kv::{CacheError, CacheStore};
use crate::utils::fmt_duration;

pub struct RedisCacheStore {
    client: redis::Client,
    url: String,
    conn: OnceCell<MultiplexedConnection>,
    timeout: Duration,
}

impl RedisCacheStore {
    /// Create a store for `url` without connecting.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(|e| CacheError::Connect {
            url: redacted(url),
            source: e.into(),
        })?;
        Ok(Self {
            client,
            url: redacted(url),
            conn: OnceCell::new(),
            timeout,
        })
    }

    /// Return the shared connection, establishing it if this is the first use.
    async fn connection(&self) -> Result<MultiplexedConnection, CacheError> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let start = Instant::now();
                let conn = tokio::time::timeout(
                    self.timeout,
                    self.client.get_multiplexed_async_connection(),
                )
                .await
                .map_err(|_| CacheError::Timeout {
                    op: "CONNECT",
                    timeout: self.timeout,
                })?
                .map_err(|e| CacheError::Connect {
                    url: self.url.clone(),
                    source: e.into(),
                })?;
                info!(
                    url = %self.url,
                    duration = fmt_duration(start.elapsed()),
                    "Redis connection established"
                );
                Ok::<_, CacheError>(conn)
            })
            .await?;
        // Clones share the underlying multiplexed pipeline.
        Ok(conn.clone())
    }

    async fn run<T, F>(&self, op: &'static str, key: &str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Command {
                op,
                key: key.to_owned(),
                source: e.into(),
            }),
            Err(_) => Err(CacheError::Timeout {
                op,
                timeout: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = self.run("GET", key, conn.get(key)).await?;
        debug!(key, hit = value.is_some(), "cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.run::<(), _>("SET", key, conn.set(key, value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let removed: i64 = self.run("DEL", key, conn.del(key)).await?;
        debug!(key, removed, "cache delete");
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let pong: String = self
            .run("PING", "", redis::cmd("PING").query_async(&mut conn))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Command {
                op: "PING",
                key: String::new(),
                source: anyhow!("unexpected reply {pong:?}"),
            })
        }
    }
}

/// Strip credentials from a connection URL before it reaches logs or errors.
fn redacted(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<invalid url>".to_owned(),
    }
}
