use anyhow::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub api: Api,
    pub history: History,
    pub segments: Segments,
    pub dashboard: Dashboard,
    pub scheduler: Scheduler,
    pub observability: Option<Observability>,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Api {
    pub leaderboard_url: String,
    pub summary_url: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct History {
    pub path: String,
}

/// Default rice/whale cutoffs; the `segments` command accepts overrides.
#[derive(Debug, Deserialize)]
pub struct Segments {
    pub rice_cutoff: f64,
    pub whale_cutoff: f64,
}

#[derive(Debug, Deserialize)]
pub struct Dashboard {
    pub top_n: usize,
}

#[derive(Debug, Deserialize)]
pub struct Scheduler {
    pub snapshot_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Observability {
    pub prometheus_port: u16,
}

impl Config {
    /// Load from `KONG_CONFIG` (or `config/default.toml`) and apply env overrides.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("KONG_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {path}"))?;
        let mut cfg = Self::from_toml_str(&content)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// `KONG_API_URL` / `KONG_SUMMARY_URL` replace the configured endpoints.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("KONG_API_URL").filter(|s| !s.trim().is_empty()) {
            self.api.leaderboard_url = url;
        }
        if let Some(url) = lookup("KONG_SUMMARY_URL").filter(|s| !s.trim().is_empty()) {
            self.api.summary_url = url;
        }
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert!(config.segments.rice_cutoff < config.segments.whale_cutoff);
        assert_eq!(config.history.path, "data/summaries/daily.csv");
        assert!(config.scheduler.snapshot_interval_secs > 0);
    }

    #[test]
    fn test_observability_section_optional() {
        let toml = r#"
[general]
log_level = "debug"

[api]
leaderboard_url = "http://localhost:1/leaderboard/export"
summary_url = "http://localhost:1/staking-summary"
request_timeout_secs = 5
max_retries = 0
backoff_base_ms = 10

[history]
path = "/tmp/daily.csv"

[segments]
rice_cutoff = 1000.0
whale_cutoff = 100000.0

[dashboard]
top_n = 5

[scheduler]
snapshot_interval_secs = 60
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.observability.is_none());
        assert_eq!(config.dashboard.top_n, 5);
    }

    #[test]
    fn test_env_overrides_replace_urls() {
        let mut config =
            Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        config.apply_env_overrides(|key| match key {
            "KONG_API_URL" => Some("http://mirror/export".to_string()),
            "KONG_SUMMARY_URL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.api.leaderboard_url, "http://mirror/export");
        // blank override is ignored
        assert!(config.api.summary_url.ends_with("/staking-summary"));
    }
}
