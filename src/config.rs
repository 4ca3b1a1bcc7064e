use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub upstream: UpstreamConfig,
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Local time.
    pub vacuum_schedule: Option<String>,
}

fn default_retention_days() -> u32 {
    90
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Per-coin workers endpoint URLs, keyed by coin type (e.g. "btc", "kas").
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_collect_interval_secs")]
    pub collect_interval_secs: u64,
    /// UTC hour (0-23) at which the daily rollup runs.
    #[serde(default = "default_rollup_hour")]
    pub rollup_hour: u32,
}

fn default_collect_interval_secs() -> u64 {
    900
}

fn default_rollup_hour() -> u32 {
    1
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            !self.upstream.endpoints.is_empty(),
            "upstream.endpoints must configure at least one coin"
        );
        anyhow::ensure!(
            self.collector.collect_interval_secs > 0,
            "collector.collect_interval_secs must be > 0, got {}",
            self.collector.collect_interval_secs
        );
        anyhow::ensure!(
            self.collector.rollup_hour < 24,
            "collector.rollup_hour must be between 0 and 23, got {}",
            self.collector.rollup_hour
        );
        Ok(())
    }
}
