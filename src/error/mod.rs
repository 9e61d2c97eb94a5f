//! Error handling for the wallet core
//!
//! Every fallible operation returns one of these variants. The first group is
//! the local taxonomy (validation, derivation, envelopes, swaps); the second
//! group wraps failures reported by the ledger or relay collaborators, which
//! are surfaced as-is and never retried here.

use thiserror::Error;

/// Result type alias for wallet operations
pub type Result<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Not enough value of the requested asset class
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    /// Mixed asset variants or differing DRS transaction hashes
    #[error("Assets incompatible: {0}")]
    AssetsIncompatible(String),

    /// Selection gathered nothing
    #[error("No inputs could be gathered for the transaction")]
    NoInputs,

    /// One or more inputs could not be built
    #[error("Invalid inputs: {}", .0.join("; "))]
    InvalidInputs(Vec<String>),

    #[error("Key-pair not found for address {0}")]
    KeypairNotFound(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Corrupt envelope or wrong passphrase; deliberately carries no detail
    #[error("Unable to decrypt data")]
    DecryptionFailed,

    #[error("Invalid DRUID: {0}")]
    InvalidDruid(String),

    #[error("Expected exactly one pending record for {druid}, found {found}")]
    DruidRecordNotSingular { druid: String, found: usize },

    #[error("No addresses could be regenerated from the seed phrase")]
    AddressRegenerationExhausted,

    #[error("Invalid seed phrase: {0}")]
    InvalidSeedPhrase(String),

    /// Ledger node rejected a request or could not be reached
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Relay rejected a request or could not be reached
    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        WalletError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for WalletError {
    fn from(err: bincode::error::EncodeError) -> Self {
        WalletError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for WalletError {
    fn from(err: bincode::error::DecodeError) -> Self {
        WalletError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(err: toml::de::Error) -> Self {
        WalletError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_display() {
        let err = WalletError::InsufficientFunds {
            required: 1050,
            available: 60,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 1050, available 60"
        );
    }

    #[test]
    fn test_invalid_inputs_joins_failures() {
        let err = WalletError::InvalidInputs(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "Invalid inputs: first; second");
    }

    #[test]
    fn test_decryption_failed_has_no_detail() {
        assert_eq!(
            WalletError::DecryptionFailed.to_string(),
            "Unable to decrypt data"
        );
    }
}
