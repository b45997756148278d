use std::{env, str::FromStr, time::Duration};

use anyhow::{Context, anyhow, bail};
use tracing::Level;

use crate::integrations::graph::GraphConfig;

/// Where analytics snapshots are kept between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsCache {
    Database,
    Memory,
}

impl FromStr for AnalyticsCache {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "database" => Ok(AnalyticsCache::Database),
            "memory" => Ok(AnalyticsCache::Memory),
            other => Err(anyhow!("expected `database` or `memory`, got `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub log_dir: String,
    pub log_level: Level,

    /// `None` disables every external integration
    pub graph: Option<GraphConfig>,
    pub analytics_cache: AnalyticsCache,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        fn parsed<T>(key: &str, raw: String) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::fmt::Display,
        {
            raw.trim()
                .parse()
                .map_err(|e| anyhow!("{key}: invalid value `{raw}`: {e}"))
        }

        let timeout_secs: u64 = parsed(
            "INTEGRATION_TIMEOUT_SECS",
            or_default("INTEGRATION_TIMEOUT_SECS", "10"),
        )?;
        if timeout_secs == 0 {
            bail!("INTEGRATION_TIMEOUT_SECS must be positive");
        }

        let credentials = (
            lookup("GRAPH_TENANT_ID"),
            lookup("GRAPH_CLIENT_ID"),
            lookup("GRAPH_CLIENT_SECRET"),
        );
        let graph = match credentials {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Some(GraphConfig {
                tenant_id,
                client_id,
                client_secret,
                base_url: or_default("GRAPH_BASE_URL", "https://graph.microsoft.com/v1.0"),
                token_url: lookup("GRAPH_TOKEN_URL"),
                time_zone: or_default("GRAPH_TIME_ZONE", "Europe/Berlin"),
                app_url: or_default("APP_URL", "http://localhost:8080"),
                timeout: Duration::from_secs(timeout_secs),
            }),
            (None, None, None) => None,
            _ => bail!("GRAPH_TENANT_ID, GRAPH_CLIENT_ID and GRAPH_CLIENT_SECRET must be set together"),
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            api_prefix: or_default("API_PREFIX", "/api"),
            rate_protected_per_min: parsed(
                "RATE_PROTECTED_PER_MIN",
                or_default("RATE_PROTECTED_PER_MIN", "1000"),
            )?,
            log_dir: or_default("LOG_DIR", "logs"),
            log_level: parsed("LOG_LEVEL", or_default("LOG_LEVEL", "debug"))?,
            graph,
            analytics_cache: parsed("ANALYTICS_CACHE", or_default("ANALYTICS_CACHE", "database"))?,
        })
    }
}
