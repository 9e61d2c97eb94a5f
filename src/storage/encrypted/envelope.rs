// Typed envelopes for long-lived wallet secrets.
// Everything funnels through `encrypt_value`/`decrypt_value`, which seal the
// bincode encoding of a value. Key-pairs are the one special case: their
// address and version stay readable so a store can index them without the
// passphrase, and only the raw key bytes are sealed.

use crate::core::Transaction;
use crate::error::{Result, WalletError};
use crate::storage::encrypted::cipher::{Envelope, EnvelopeCipher};
use crate::utils::{deserialize, serialize, PUBLIC_KEY_LEN, SECRET_KEY_LEN};
use crate::wallet::{AddressVersion, KeyPair, MasterKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

pub fn encrypt_value<T: Serialize>(cipher: &EnvelopeCipher, value: &T) -> Result<Envelope> {
    let mut plaintext = serialize(value)?;
    let sealed = cipher.seal(&plaintext);
    plaintext.zeroize();
    sealed
}

/// Open and decode; a payload that opens but does not decode is still a
/// `DecryptionFailed`
pub fn decrypt_value<T: DeserializeOwned>(cipher: &EnvelopeCipher, envelope: &Envelope) -> Result<T> {
    let mut plaintext = cipher.open(envelope)?;
    let value = deserialize(&plaintext).map_err(|_| WalletError::DecryptionFailed);
    plaintext.zeroize();
    value
}

pub fn encrypt_master_key(cipher: &EnvelopeCipher, master_key: &MasterKey) -> Result<Envelope> {
    encrypt_value(cipher, master_key)
}

pub fn decrypt_master_key(cipher: &EnvelopeCipher, envelope: &Envelope) -> Result<MasterKey> {
    decrypt_value(cipher, envelope)
}

pub fn encrypt_transaction(cipher: &EnvelopeCipher, transaction: &Transaction) -> Result<Envelope> {
    encrypt_value(cipher, transaction)
}

pub fn decrypt_transaction(cipher: &EnvelopeCipher, envelope: &Envelope) -> Result<Transaction> {
    decrypt_value(cipher, envelope)
}

/// Key-pair at rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeypair {
    pub address: String,
    pub version: AddressVersion,
    /// Seals `public_key ‖ secret_key`
    pub envelope: Envelope,
}

pub fn encrypt_keypair(cipher: &EnvelopeCipher, keypair: &KeyPair) -> Result<EncryptedKeypair> {
    let mut raw = Vec::with_capacity(PUBLIC_KEY_LEN + SECRET_KEY_LEN);
    raw.extend_from_slice(keypair.public_key());
    raw.extend_from_slice(keypair.secret_key());
    let envelope = cipher.seal(&raw);
    raw.zeroize();

    Ok(EncryptedKeypair {
        address: keypair.address().to_string(),
        version: keypair.version(),
        envelope: envelope?,
    })
}

/// Rebuilds the key-pair from its secret and refuses it unless the public key
/// and address still line up with what was stored
pub fn decrypt_keypair(cipher: &EnvelopeCipher, encrypted: &EncryptedKeypair) -> Result<KeyPair> {
    let mut raw = cipher.open(&encrypted.envelope)?;
    if raw.len() != PUBLIC_KEY_LEN + SECRET_KEY_LEN {
        raw.zeroize();
        return Err(WalletError::DecryptionFailed);
    }

    let mut secret_key = [0u8; SECRET_KEY_LEN];
    secret_key.copy_from_slice(&raw[PUBLIC_KEY_LEN..]);
    let keypair = KeyPair::from_secret_key(secret_key, encrypted.version);
    let consistent =
        keypair.public_key()[..] == raw[..PUBLIC_KEY_LEN] && keypair.address() == encrypted.address;
    secret_key.zeroize();
    raw.zeroize();

    if !consistent {
        log::warn!("Stored key-pair for {} failed its consistency check", encrypted.address);
        return Err(WalletError::DecryptionFailed);
    }
    Ok(keypair)
}
