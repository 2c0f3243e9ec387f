//! Configuration management for the dashboard core

use crate::analytics::AnalyticsConfig;
use crate::history::HistoryConfig;
use crate::mock_scorer::ScorerConfig;
use crate::rule_engine::RuleEngineConfig;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub scorer: ScorerConfig,
    pub rules: RuleEngineConfig,
    pub analytics: AnalyticsConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Defaults overridden by `FRAUD_DASHBOARD__*` environment variables
    pub fn load() -> crate::Result<Self> {
        let config = Config::builder()
            .add_source(environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("FRAUD_DASHBOARD")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule_engine::RuleId;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DashboardConfig::default();
        assert_eq!(config.scorer.flip_probability, 0.7);
        assert_eq!(config.scorer.amount_threshold, 10_000.0);
        assert_eq!(config.rules.fraud_threshold, 0.3);
        assert_eq!(config.analytics.type_sample_size, 100);
        assert_eq!(config.history.max_entries, 100);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scorer]\nflip_probability = 0.25\n\n[rules]\ndisabled_rules = [\"odd_hours\"]\n\n[history]\nmax_entries = 20"
        )
        .unwrap();

        let config = DashboardConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.scorer.flip_probability, 0.25);
        assert_eq!(config.scorer.new_account_days, 30);
        assert_eq!(config.rules.disabled_rules, vec![RuleId::OddHours]);
        assert_eq!(config.history.max_entries, 20);
        assert_eq!(config.analytics, AnalyticsConfig::default());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(DashboardConfig::load_from_path("/nonexistent/dashboard.toml").is_err());
    }
}
