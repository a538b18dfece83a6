// =============================================================================
// Dashboard Configuration — JSON file with environment overrides
// =============================================================================
//
// All fields carry `#[serde(default)]` so a partial (or empty) config file is
// always valid. Environment variables win over the file so hosting platforms
// can route traffic without touching it.
// =============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "dashboard_config.json";

/// Floor for the refresh interval.
const MIN_REFRESH_INTERVAL_MS: u64 = 100;

fn default_db_path() -> PathBuf {
    PathBuf::from("buy_sell_aggregates.db")
}

fn default_bind_addr() -> String {
    "0.0.0.0:8050".to_string()
}

fn default_refresh_interval_ms() -> u64 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    1000
}

fn default_title() -> String {
    "Buy / Sell 1-Min Aggregation Dashboard".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// SQLite file written by the aggregation producer.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Milliseconds between refresh ticks.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// How long a read waits on a locked store before failing the tick.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Page heading.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            refresh_interval_ms: default_refresh_interval_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            title: default_title(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            db_path = %config.db_path.display(),
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Load from `AGGDASH_CONFIG` (or the default path), falling back to
    /// defaults, then apply environment overrides.
    pub fn from_env() -> Self {
        let path =
            std::env::var("AGGDASH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Self::default()
        });
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from a key lookup. Split out from [`Self::from_env`] so
    /// tests need not touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("AGGDASH_DB_PATH").filter(|s| !s.trim().is_empty()) {
            self.db_path = PathBuf::from(db.trim());
        }

        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(addr) = lookup("AGGDASH_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }

        if let Some(ms) = lookup("AGGDASH_REFRESH_MS") {
            match ms.trim().parse::<u64>() {
                Ok(v) => self.refresh_interval_ms = v,
                Err(e) => warn!(value = %ms, error = %e, "Ignoring invalid AGGDASH_REFRESH_MS"),
            }
        }

        if self.refresh_interval_ms < MIN_REFRESH_INTERVAL_MS {
            warn!(
                requested = self.refresh_interval_ms,
                floor = MIN_REFRESH_INTERVAL_MS,
                "refresh interval too small, clamping"
            );
            self.refresh_interval_ms = MIN_REFRESH_INTERVAL_MS;
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}
