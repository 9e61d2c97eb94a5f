//! Storage of wallet secrets
//!
//! Persistence itself belongs to the embedding application; this module only
//! produces and opens the encrypted forms it stores.

pub mod encrypted;

pub use encrypted::{
    decrypt_keypair, decrypt_master_key, decrypt_transaction, decrypt_value, encrypt_keypair,
    encrypt_master_key, encrypt_transaction, encrypt_value, EncryptedKeypair, Envelope,
    EnvelopeCipher, SecureKey,
};
