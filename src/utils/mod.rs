//! Utility functions and helpers
//!
//! Hashing, hex encoding, Ed25519 primitives and the binary encoding used
//! for encrypted envelopes.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    ed25519_public_key, ed25519_sign, ed25519_verify, hex_decode, hex_encode, sha3_256_digest,
    sha3_256_hex, PUBLIC_KEY_LEN, SECRET_KEY_LEN, SIGNATURE_LEN,
};

pub use serialization::{deserialize, serialize};
