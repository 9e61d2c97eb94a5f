//! Key management and the wallet session
//!
//! Deterministic key derivation and the three address schemes, the swap
//! coordinator, and the `Wallet` session tying them to a configuration.

pub mod exchange;
pub mod keys;
#[allow(clippy::module_inception)]
pub mod wallet;

pub use exchange::{
    ExchangeCoordinator, FinalizeOutcome, InitiatedSwap, RespondOutcome, SwapProposal,
};
pub use keys::{
    construct_address, derive_child_keypair, derive_master_key, derive_passphrase_key,
    generate_next_unused_keypair, generate_seed_phrase, regenerate_addresses,
    regenerate_addresses_from_seed, validate_seed_phrase, verify_message, AddressVersion,
    KeyPair, MasterKey, OLD_ADDRESS_VERSION, TEMP_ADDRESS_VERSION,
};
pub use wallet::{ItemCreation, Wallet};
