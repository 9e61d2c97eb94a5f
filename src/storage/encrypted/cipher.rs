use crate::error::{Result, WalletError};
use crate::wallet::derive_passphrase_key;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

/// Ciphertext and the nonce it was sealed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Key material that is wiped when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureKey {
    key: [u8; KEY_LEN],
}

impl SecureKey {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            WalletError::EncryptionFailed(format!("AES-256-GCM requires a {KEY_LEN}-byte key"))
        })?;
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureKey").field("length", &KEY_LEN).finish()
    }
}

/// AES-256-GCM with a fresh random nonce per seal
pub struct EnvelopeCipher {
    cipher: Aes256Gcm,
}

impl EnvelopeCipher {
    pub fn new(key: SecureKey) -> Self {
        let aes_key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(aes_key),
        }
    }

    /// Cipher keyed by [`derive_passphrase_key`]
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = derive_passphrase_key(passphrase);
        let cipher = Self::new(SecureKey::new(key));
        key.zeroize();
        cipher
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Envelope> {
        let mut nonce = vec![0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| WalletError::EncryptionFailed(format!("AES-256-GCM: {e}")))?;

        Ok(Envelope { nonce, ciphertext })
    }

    /// Any failure, including a malformed nonce, is `DecryptionFailed`
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        if envelope.nonce.len() != NONCE_LEN {
            return Err(WalletError::DecryptionFailed);
        }
        self.cipher
            .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
            .map_err(|_| WalletError::DecryptionFailed)
    }
}

impl std::fmt::Debug for EnvelopeCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeCipher(AES-256-GCM)")
    }
}
