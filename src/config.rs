use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::account::types::{RecoveryPolicy, DEFAULT_TIME_LOCK_SECS};
use crate::error::WalletError;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WalletConfig {
    pub factory: FactoryConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FactoryConfig {
    /// 32-byte hex domain separating this factory's addresses from any other deployment.
    pub domain: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RecoveryConfig {
    #[serde(default = "default_time_lock_secs")]
    pub time_lock_secs: u64,
    #[serde(default = "default_quorum")]
    pub quorum: u32,
    #[serde(default)]
    pub expiry_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> String {
    "./data/wallets".to_string()
}

fn default_time_lock_secs() -> u64 {
    DEFAULT_TIME_LOCK_SECS
}

fn default_quorum() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            time_lock_secs: default_time_lock_secs(),
            quorum: default_quorum(),
            expiry_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            factory: FactoryConfig {
                domain: hex::encode([0u8; 32]),
                db_path: default_db_path(),
            },
            recovery: RecoveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl WalletConfig {
    /// Load the config at `path`, writing the defaults there if it does not exist yet.
    pub fn load_or_default(path: &str) -> Result<Self, WalletError> {
        if Path::new(path).exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| WalletError::Config(format!("reading {}: {}", path, e)))?;
            let config: Self = toml::from_str(&s)
                .map_err(|e| WalletError::Config(format!("parsing {}: {}", path, e)))?;
            config.validate()?;
            info!("Config loaded from {}", path);
            Ok(config)
        } else {
            warn!("Config file not found at '{}'. Creating default.", path);
            let config = Self::default();
            let s = toml::to_string_pretty(&config).map_err(|e| WalletError::Config(e.to_string()))?;
            if let Err(e) = std::fs::write(path, s) {
                warn!("Could not write default config to {}: {}", path, e);
            }
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        self.domain()?;
        if self.recovery.quorum == 0 {
            return Err(WalletError::Config("recovery.quorum must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn domain(&self) -> Result<[u8; 32], WalletError> {
        let bytes = hex::decode(self.factory.domain.trim_start_matches("0x"))
            .map_err(|e| WalletError::Config(format!("factory.domain: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| WalletError::Config("factory.domain must be 32 bytes".to_string()))
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        RecoveryPolicy {
            time_lock_secs: self.recovery.time_lock_secs,
            quorum: self.recovery.quorum,
            expiry_secs: self.recovery.expiry_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config: WalletConfig = toml::from_str(
            r#"
            [factory]
            domain = "0101010101010101010101010101010101010101010101010101010101010101"
            "#,
        )
        .unwrap();
        assert_eq!(config.domain().unwrap(), [1u8; 32]);
        assert_eq!(config.recovery_policy(), RecoveryPolicy::default());
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = WalletConfig::default();
        config.recovery.quorum = 0;
        assert!(matches!(config.validate(), Err(WalletError::Config(_))));

        let mut config = WalletConfig::default();
        config.factory.domain = "abcd".to_string();
        assert!(matches!(config.validate(), Err(WalletError::Config(_))));
    }

    #[test]
    fn test_load_or_default_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creso.toml");
        let path = path.to_str().unwrap();

        let written = WalletConfig::load_or_default(path).unwrap();
        assert!(Path::new(path).exists());
        let reloaded = WalletConfig::load_or_default(path).unwrap();
        assert_eq!(written, reloaded);
    }
}
