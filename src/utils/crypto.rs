use data_encoding::HEXLOWER;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_256};

use crate::error::{Result, WalletError};

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SECRET_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

pub fn sha3_256_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// SHA3-256 of `data`, lowercase hex encoded
pub fn sha3_256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(&sha3_256_digest(data))
}

pub fn hex_encode(data: &[u8]) -> String {
    HEXLOWER.encode(data)
}

pub fn hex_decode(data: &str) -> Result<Vec<u8>> {
    HEXLOWER
        .decode(data.to_ascii_lowercase().as_bytes())
        .map_err(|e| WalletError::Serialization(format!("Invalid hex string: {e}")))
}

/// Detached Ed25519 signature over `message`
pub fn ed25519_sign(secret_key: &[u8; SECRET_KEY_LEN], message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let signing_key = SigningKey::from_bytes(secret_key);
    signing_key.sign(message).to_bytes()
}

pub fn ed25519_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let Ok(public_key) = <[u8; PUBLIC_KEY_LEN]>::try_from(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &signature).is_ok()
}

pub fn ed25519_public_key(secret_key: &[u8; SECRET_KEY_LEN]) -> [u8; PUBLIC_KEY_LEN] {
    SigningKey::from_bytes(secret_key).verifying_key().to_bytes()
}
