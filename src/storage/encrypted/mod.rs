//! Encryption at rest for wallet secrets
//!
//! AES-256-GCM envelopes keyed from the wallet passphrase. Only key material
//! and locally held swap halves are sealed; addresses and versions of
//! key-pairs are left readable.

pub mod cipher;
pub mod envelope;

pub use cipher::{Envelope, EnvelopeCipher, SecureKey, KEY_LEN, NONCE_LEN};
pub use envelope::{
    decrypt_keypair, decrypt_master_key, decrypt_transaction, decrypt_value, encrypt_keypair,
    encrypt_master_key, encrypt_transaction, encrypt_value, EncryptedKeypair,
};
