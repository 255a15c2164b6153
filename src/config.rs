use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    /// Per-location overrides and additions to the built-in category table.
    #[serde(default)]
    pub locations: HashMap<String, LocationOverride>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Seconds between trigger ticks in `courier run`.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Literal token in a pickup path that expands to today's `yyyyMMdd`.
    #[serde(default = "default_date_placeholder")]
    pub date_placeholder: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            date_placeholder: default_date_placeholder(),
        }
    }
}

fn default_interval_secs() -> u64 {
    300
}
fn default_date_placeholder() -> String {
    "YYYYMMDD".to_string()
}

/// Out-of-band alert channel. Alerts are disabled when `url` is absent.
#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    pub url: Option<String>,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    /// Comma-separated recipients; only attached when the alert asks to notify.
    #[serde(default)]
    pub notify_addresses: Option<String>,
    /// Overrides the environment-derived account label on alerts.
    #[serde(default)]
    pub account_label: Option<String>,
    #[serde(default = "default_alert_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            url: None,
            app_name: default_app_name(),
            email_subject: None,
            from_address: None,
            notify_addresses: None,
            account_label: None,
            timeout_secs: default_alert_timeout_secs(),
        }
    }
}

fn default_app_name() -> String {
    "batch-courier".to_string()
}
fn default_alert_timeout_secs() -> u64 {
    10
}

/// Bulk historical sweep. `courier run` performs a single recovery sweep
/// instead of the live loop when `enabled` is set; `courier recover` always
/// runs one regardless.
#[derive(Debug, Deserialize, Clone)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Destination root for every recovered file.
    pub dropoff_root: Option<PathBuf>,
    /// Root holding date-bucketed subfolders, for date-templated rules.
    pub bucket_root: Option<PathBuf>,
    /// Fixed sub-path between a date bucket and the location-name folder.
    #[serde(default = "default_bucket_subdir")]
    pub bucket_subdir: String,
    /// Inclusive start of the recovery window.
    pub beginning: Option<NaiveDate>,
    /// Exclusive end of the recovery window.
    pub ending: Option<NaiveDate>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dropoff_root: None,
            bucket_root: None,
            bucket_subdir: default_bucket_subdir(),
            beginning: None,
            ending: None,
        }
    }
}

fn default_bucket_subdir() -> String {
    "CASHLETTER".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationOverride {
    pub pattern: String,
    /// Return-category files arrive a day behind; search one day further back.
    #[serde(default)]
    pub delayed: bool,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.engine.interval_secs == 0 {
        anyhow::bail!("engine.interval_secs must be > 0");
    }

    if config.engine.date_placeholder.is_empty() {
        anyhow::bail!("engine.date_placeholder must not be empty");
    }

    if let (Some(begin), Some(end)) = (config.recovery.beginning, config.recovery.ending) {
        if begin >= end {
            anyhow::bail!("recovery.beginning must be before recovery.ending");
        }
    }

    if config.recovery.enabled && config.recovery.dropoff_root.is_none() {
        anyhow::bail!("recovery.dropoff_root must be set when recovery is enabled");
    }

    Ok(config)
}

impl RecoveryConfig {
    /// Resolve the configured window, with both bounds required.
    pub fn window(&self) -> Result<(NaiveDate, NaiveDate)> {
        match (self.beginning, self.ending) {
            (Some(b), Some(e)) if b < e => Ok((b, e)),
            (Some(_), Some(_)) => {
                anyhow::bail!("recovery.beginning must be before recovery.ending")
            }
            _ => anyhow::bail!(
                "recovery window is not configured: set recovery.beginning and recovery.ending"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config: Config = toml::from_str(
            r#"
            [db]
            path = "./data/courier.sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.interval_secs, 300);
        assert_eq!(config.engine.date_placeholder, "YYYYMMDD");
        assert!(config.alerts.url.is_none());
        assert!(!config.recovery.enabled);
        assert_eq!(config.recovery.bucket_subdir, "CASHLETTER");
        assert!(config.locations.is_empty());
    }

    #[test]
    fn test_location_overrides_parse() {
        let config: Config = toml::from_str(
            r#"
            [db]
            path = "x.sqlite"

            [locations.lockbox]
            pattern = "*LBX*"

            [locations.wires-return]
            pattern = "*WRET*"
            delayed = true
            "#,
        )
        .unwrap();

        assert_eq!(config.locations["lockbox"].pattern, "*LBX*");
        assert!(!config.locations["lockbox"].delayed);
        assert!(config.locations["wires-return"].delayed);
    }

    #[test]
    fn test_recovery_window_ordering_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("courier.toml");
        std::fs::write(
            &path,
            r#"
            [db]
            path = "x.sqlite"

            [recovery]
            beginning = "2024-03-10"
            ending = "2024-03-01"
            "#,
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("beginning must be before"));
    }
}
