//! TOML configuration with built-in defaults.
//!
//! Every section is optional; an absent file yields a fully defaulted
//! config. Only an explicitly requested file that is missing or invalid is
//! an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::monitor::{default_targets, AuditTarget, MonitorConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub monitor: MonitorSettings,
    pub personalization: PersonalizationSettings,
    /// Audit target overrides; the built-in list applies when absent.
    pub targets: Option<Vec<AuditTarget>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub history_path: PathBuf,
    pub run_delay_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from("data/performance-monitoring.json"),
            run_delay_ms: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonalizationSettings {
    pub variants_path: PathBuf,
}

impl Default for PersonalizationSettings {
    fn default() -> Self {
        Self {
            variants_path: PathBuf::from("content/personalization/keyword-variants.json"),
        }
    }
}

impl Config {
    /// Load from an explicit path, or fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// The audit target list in effect.
    pub fn targets(&self) -> Vec<AuditTarget> {
        self.targets.clone().unwrap_or_else(default_targets)
    }

    /// Engine settings derived from this config.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            history_path: self.monitor.history_path.clone(),
            run_delay: Duration::from_millis(self.monitor.run_delay_ms),
            targets: self.targets(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::Device;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.monitor.run_delay_ms, 25);
        assert_eq!(config.targets().len(), 4);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            bind = "127.0.0.1:9090"

            [monitor]
            run_delay_ms = 0
        "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:9090");
        assert_eq!(config.monitor.run_delay_ms, 0);
        assert_eq!(
            config.monitor.history_path,
            PathBuf::from("data/performance-monitoring.json")
        );
        assert_eq!(config.targets().len(), 4);
    }

    #[test]
    fn target_table_overrides_builtins() {
        let config: Config = toml::from_str(
            r#"
            [[targets]]
            id = "checkout-mobile"
            label = "Checkout - mobile"
            url = "/checkout"
            device = "mobile"
            cadence = "daily"
        "#,
        )
        .unwrap();

        let targets = config.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].id, "checkout-mobile");
        assert_eq!(targets[0].device, Device::Mobile);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
