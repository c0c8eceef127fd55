//! Configuration for the govee-ble CLI
//!
//! Stored as TOML, by default at `~/.config/govee-ble/config.toml`:
//!
//! ```toml
//! address = "A4:C1:38:5E:00:01"
//! segmented = true
//! log_level = "info"
//! repeat = 3
//!
//! [retry]
//! max_attempts = 4
//! initial_backoff_ms = 250
//! max_backoff_ms = 4000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use govee_light::{DeviceVariant, LightConfig, DEFAULT_REPEAT};
use govee_transport::protocol::timing;
use govee_transport::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Connect retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: timing::CONNECT_ATTEMPTS,
            initial_backoff_ms: timing::INITIAL_BACKOFF_MS,
            max_backoff_ms: timing::MAX_BACKOFF_MS,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bluetooth address of the light
    pub address: Option<String>,
    /// Segmented strip (0-100 brightness, segment color packets)
    pub segmented: bool,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Copies written per packet
    pub repeat: usize,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: None,
            segmented: false,
            log_level: "info".to_string(),
            repeat: DEFAULT_REPEAT,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("govee-ble")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn variant(&self) -> DeviceVariant {
        DeviceVariant::from_segmented(self.segmented)
    }

    /// Engine settings for `address`
    pub fn light_config(&self, address: &str) -> LightConfig {
        LightConfig::new(address)
            .variant(self.variant())
            .retry(self.retry.policy())
            .repeat(self.repeat.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address, None);
        assert_eq!(config.variant(), DeviceVariant::Legacy);
        assert_eq!(config.repeat, 3);
        assert_eq!(config.retry.policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_file() {
        let config = Config::from_toml(
            r#"
            address = "A4:C1:38:5E:00:01"
            segmented = true

            [retry]
            max_attempts = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.address.as_deref(), Some("A4:C1:38:5E:00:01"));
        assert_eq!(config.variant(), DeviceVariant::Segmented);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_backoff_ms, 250);

        let light = config.light_config("A4:C1:38:5E:00:01");
        assert_eq!(light.variant, DeviceVariant::Segmented);
        assert_eq!(light.retry.max_attempts, 2);
        assert_eq!(light.retry.max_backoff, Duration::from_secs(4));
    }

    #[test]
    fn test_roundtrip() {
        let config = Config {
            address: Some("A4:C1:38:00:11:22".into()),
            segmented: true,
            log_level: "debug".into(),
            repeat: 1,
            retry: RetryConfig {
                max_attempts: 6,
                initial_backoff_ms: 100,
                max_backoff_ms: 1000,
            },
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert_eq!(Config::from_toml(&toml_str).unwrap(), config);
    }

    #[test]
    fn test_missing_file_gives_default() {
        let path = std::env::temp_dir().join("govee-ble-test-missing/config.toml");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_bad_toml() {
        assert!(Config::from_toml("segmented = \"yes\"").is_err());
    }
}
