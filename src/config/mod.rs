//! Wallet configuration
//!
//! Ledger and relay endpoints plus derivation limits, loaded from TOML with
//! environment overrides.

pub mod settings;

pub use settings::{
    WalletConfig, DEFAULT_GAP_THRESHOLD, DEFAULT_LEDGER_HOST, DEFAULT_MAX_DERIVATION_ATTEMPTS,
    DEFAULT_RELAY_HOST,
};
