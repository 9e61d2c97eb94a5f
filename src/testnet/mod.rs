//! In-memory collaborators for tests and local experiments
//!
//! A ledger that settles submissions on the spot and a relay that checks
//! signatures, both behind the same traits a real transport implements.

pub mod test_utils;

pub use test_utils::*;
