//! Command-line interface
//!
//! Offline commands only: nothing here reaches a ledger or relay.

pub mod commands;

pub use commands::{AssetArg, Command, Opt};
