//! # DDE Wallet
//!
//! Client-side wallet core for a UTXO ledger that carries fungible tokens and
//! DRS-bound item assets.
//!
//! ## Layout
//! - `wallet/`: seed phrases, hardened key derivation, the three address
//!   schemes, the swap coordinator and the `Wallet` session
//! - `core/`: asset arithmetic, transaction shapes, P2PKH scripts, coin
//!   selection and assembly
//! - `storage/`: AES-256-GCM envelopes for master keys, key-pairs and
//!   unsubmitted transactions
//! - `network/`: traits the ledger and relay transports implement
//! - `testnet/`: in-memory ledger and relay
//! - `config/`, `error/`, `utils/`, `cli/`: the usual supporting pieces
//!
//! ## Swap flow
//! 1. `ExchangeCoordinator::initiate` seals A's half and posts a pending record
//! 2. `ExchangeCoordinator::respond` lets B accept (submitting B's half) or reject
//! 3. `ExchangeCoordinator::finalize` submits A's accepted halves and clears the relay

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod testnet;
pub mod utils;
pub mod wallet;

pub use crate::cli::{Command, Opt};
pub use crate::config::WalletConfig;
pub use crate::core::{Asset, BalanceSnapshot, CreatedTransaction, OutPoint, Transaction, TxIn, TxOut};
pub use crate::error::{Result, WalletError};
pub use crate::network::{BalanceProvider, LedgerSubmitter, Relay};
pub use crate::storage::{EncryptedKeypair, Envelope, EnvelopeCipher};
pub use crate::wallet::{AddressVersion, ExchangeCoordinator, KeyPair, MasterKey, Wallet};
