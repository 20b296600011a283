//! Application configuration, read once from the environment at startup.

use anyhow::{Context, bail};
use figment::Figment;
use figment::providers::Env;
use figment::value::UncasedStr;
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

use crate::brewfather::{Credentials, DEFAULT_BASE_URL};

#[derive(Deserialize)]
pub struct Config {
    /// Level for this crate's logs; `RUST_LOG` overrides it entirely.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Missing credentials are reported on the first upstream fetch.
    #[serde(default)]
    pub brewfather_user_id: Option<String>,
    #[serde(default)]
    pub brewfather_api_key: Option<String>,
    #[serde(default = "default_brewfather_base_url")]
    pub brewfather_base_url: String,

    /// `redis://host:port[/db]`, or `memory://` for an in-process cache.
    pub redis_url: String,

    /// How often every batch category is invalidated and refetched. Cache
    /// entries carry no TTL, so this bounds how stale a listing can be.
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub refresh_interval: Duration,
    #[serde(
        default = "default_upstream_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub upstream_timeout: Duration,
    #[serde(
        default = "default_cache_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub cache_timeout: Duration,
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_brewfather_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(8)
}

/// Which cache store a `REDIS_URL` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl Config {
    /// Load from the process environment.
    pub fn load() -> Result<Self, anyhow::Error> {
        Self::from_figment(Figment::new().merge(Env::raw().map(|k| {
            if k == UncasedStr::new("RAILWAY_DEPLOYMENT_DRAINING_SECONDS") {
                "SHUTDOWN_TIMEOUT".into()
            } else {
                k.into()
            }
        })))
    }

    /// Extract and validate from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self, anyhow::Error> {
        let config: Config = figment.extract().context("Failed to load config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        for (name, value) in [
            ("REFRESH_INTERVAL", self.refresh_interval),
            ("UPSTREAM_TIMEOUT", self.upstream_timeout),
            ("CACHE_TIMEOUT", self.cache_timeout),
        ] {
            if value.is_zero() {
                bail!("{name} must be greater than zero");
            }
        }

        let base = url::Url::parse(&self.brewfather_base_url)
            .context("BREWFATHER_BASE_URL is not a valid URL")?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("BREWFATHER_BASE_URL must be an http(s) URL");
        }

        self.cache_backend()?;
        Ok(())
    }

    pub fn cache_backend(&self) -> Result<CacheBackend, anyhow::Error> {
        let url = url::Url::parse(&self.redis_url).context("REDIS_URL is not a valid URL")?;
        match url.scheme() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => bail!("REDIS_URL scheme {other:?} is not supported (use redis:// or memory://)"),
        }
    }

    pub fn brewfather_credentials(&self) -> Credentials {
        Credentials {
            user_id: self.brewfather_user_id.clone(),
            api_key: self.brewfather_api_key.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("port", &self.port)
            .field("brewfather_user_id", &secret(&self.brewfather_user_id))
            .field("brewfather_api_key", &secret(&self.brewfather_api_key))
            .field("brewfather_base_url", &self.brewfather_base_url)
            .field("refresh_interval", &self.refresh_interval)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("cache_timeout", &self.cache_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

/// Parse a duration from a bare number of seconds or a string like `90s`, `5m`, `250ms`.
fn parse_duration(value: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(value.trim())
        .map_err(|e| format!("invalid duration {value:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {value:?}: {e}"))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl serde::de::Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number of seconds or a duration string like \"5m\"")
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Duration, E> {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Duration, E> {
            Duration::try_from_secs_f64(v).map_err(E::custom)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Duration, E> {
            parse_duration(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
