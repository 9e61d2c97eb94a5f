use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const DEFAULT_LEDGER_HOST: &str = "http://127.0.0.1:3003";
pub const DEFAULT_RELAY_HOST: &str = "http://127.0.0.1:3030";
pub const DEFAULT_GAP_THRESHOLD: u32 = 20;
pub const DEFAULT_MAX_DERIVATION_ATTEMPTS: u32 = 1000;

const LEDGER_HOST_KEY: &str = "WALLET_LEDGER_HOST";
const RELAY_HOST_KEY: &str = "WALLET_RELAY_HOST";
const GAP_THRESHOLD_KEY: &str = "WALLET_GAP_THRESHOLD";

/// Settings for one wallet session.
///
/// Built once and passed by reference; nothing mutates it after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Ledger node used for balances and plain payments
    pub ledger_host: String,
    /// Relay holding swap records
    pub relay_host: String,
    /// Consecutive empty depths before address regeneration stops
    pub gap_threshold: u32,
    /// Collisions tolerated when looking for an unused key-pair
    pub max_derivation_attempts: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            ledger_host: DEFAULT_LEDGER_HOST.to_string(),
            relay_host: DEFAULT_RELAY_HOST.to_string(),
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            max_derivation_attempts: DEFAULT_MAX_DERIVATION_ATTEMPTS,
        }
    }
}

impl WalletConfig {
    pub fn from_toml_str(text: &str) -> Result<WalletConfig> {
        let config: WalletConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<WalletConfig> {
        let text = fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded wallet config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    /// Defaults or `path`, then the process environment on top
    pub fn load(path: Option<&Path>) -> Result<WalletConfig> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    /// Apply `WALLET_*` overrides read through `lookup`
    pub fn with_overrides<F>(self, lookup: F) -> Result<WalletConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self;
        if let Some(host) = lookup(LEDGER_HOST_KEY) {
            config.ledger_host = host;
        }
        if let Some(host) = lookup(RELAY_HOST_KEY) {
            config.relay_host = host;
        }
        if let Some(gap) = lookup(GAP_THRESHOLD_KEY) {
            config.gap_threshold = gap
                .trim()
                .parse()
                .map_err(|_| WalletError::Config(format!("{GAP_THRESHOLD_KEY}={gap} is not a number")))?;
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.ledger_host.trim().is_empty() {
            return Err(WalletError::Config("ledger_host is empty".to_string()));
        }
        if self.relay_host.trim().is_empty() {
            return Err(WalletError::Config("relay_host is empty".to_string()));
        }
        if self.gap_threshold == 0 {
            return Err(WalletError::Config("gap_threshold must be positive".to_string()));
        }
        if self.max_derivation_attempts == 0 {
            return Err(WalletError::Config(
                "max_derivation_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WalletConfig::default();
        assert_eq!(config.gap_threshold, DEFAULT_GAP_THRESHOLD);
        assert_eq!(config.max_derivation_attempts, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ledger_host = \"http://ledger:3003\"").unwrap();
        writeln!(file, "gap_threshold = 5").unwrap();

        let config = WalletConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ledger_host, "http://ledger:3003");
        assert_eq!(config.gap_threshold, 5);
        assert_eq!(config.relay_host, DEFAULT_RELAY_HOST);
    }

    #[test]
    fn test_bad_files_are_config_errors() {
        assert!(matches!(
            WalletConfig::from_toml_str("gap_threshold = \"many\""),
            Err(WalletError::Config(_))
        ));
        assert!(matches!(
            WalletConfig::from_toml_str("gap_threshold = 0"),
            Err(WalletError::Config(_))
        ));
        assert!(matches!(
            WalletConfig::from_file("/definitely/not/here.toml"),
            Err(WalletError::Io(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WALLET_LEDGER_HOST", "http://l"),
            ("WALLET_RELAY_HOST", "http://r"),
            ("WALLET_GAP_THRESHOLD", "7"),
        ]
        .into_iter()
        .collect();
        let config = WalletConfig::default()
            .with_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.ledger_host, "http://l");
        assert_eq!(config.relay_host, "http://r");
        assert_eq!(config.gap_threshold, 7);

        assert!(matches!(
            WalletConfig::default().with_overrides(|key| {
                (key == "WALLET_GAP_THRESHOLD").then(|| "seven".to_string())
            }),
            Err(WalletError::Config(_))
        ));
    }
}
