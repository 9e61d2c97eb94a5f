//! Contracts for the remote collaborators
//!
//! The ledger node and the swap relay are reached through these traits. The
//! wallet never talks HTTP itself; embedding applications plug in a
//! transport, and `testnet` provides in-memory stand-ins.

pub mod ledger;
pub mod relay;

pub use ledger::{BalanceProvider, LedgerSubmitter, SubmitResponse};
pub use relay::{ExchangeStatus, PendingExchange, Relay, RelayAuth, RelayKey, RelayRecord};
