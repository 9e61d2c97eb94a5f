//! Deterministic key management
//!
//! A BIP-39 seed phrase yields a BIP-32 master key. Each key-pair is the
//! Ed25519 key seeded by the private key of the hardened child `m/depth'`,
//! so the same `(master, depth, version)` always produces the same key-pair
//! and address.
//!
//! Three address schemes are live at once. Addresses minted under the
//! temporary and old schemes still hold funds, so all three must keep
//! producing bit-exact output.

use crate::error::{Result, WalletError};
use crate::utils::{
    ed25519_public_key, ed25519_sign, ed25519_verify, hex_decode, hex_encode, sha3_256_hex,
    PUBLIC_KEY_LEN, SECRET_KEY_LEN,
};
use bip32::{ChildNumber, Prefix, XPrv};
use bip39::Mnemonic;
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Wire value of the temporary address scheme
pub const TEMP_ADDRESS_VERSION: u64 = 99999;
/// Wire value of the legacy address scheme
pub const OLD_ADDRESS_VERSION: u64 = 0;
/// Length of a legacy address in hex characters
pub const OLD_ADDRESS_LEN: usize = 32;

const SEED_PHRASE_WORDS: usize = 12;

/// Address hashing generation. `Latest` travels as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<u64>", into = "Option<u64>")]
pub enum AddressVersion {
    #[default]
    Latest,
    Temporary,
    Old,
}

impl TryFrom<Option<u64>> for AddressVersion {
    type Error = String;

    fn try_from(value: Option<u64>) -> std::result::Result<Self, Self::Error> {
        match value {
            None => Ok(AddressVersion::Latest),
            Some(TEMP_ADDRESS_VERSION) => Ok(AddressVersion::Temporary),
            Some(OLD_ADDRESS_VERSION) => Ok(AddressVersion::Old),
            Some(other) => Err(format!("unknown address version {other}")),
        }
    }
}

impl From<AddressVersion> for Option<u64> {
    fn from(version: AddressVersion) -> Self {
        match version {
            AddressVersion::Latest => None,
            AddressVersion::Temporary => Some(TEMP_ADDRESS_VERSION),
            AddressVersion::Old => Some(OLD_ADDRESS_VERSION),
        }
    }
}

impl std::str::FromStr for AddressVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest" | "default" | "null" => Ok(AddressVersion::Latest),
            "temp" | "temporary" => Ok(AddressVersion::Temporary),
            "old" => Ok(AddressVersion::Old),
            _ => Err(format!(
                "Invalid address version: {s}. Valid options: latest, temporary, old"
            )),
        }
    }
}

impl fmt::Display for AddressVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressVersion::Latest => write!(f, "latest"),
            AddressVersion::Temporary => write!(f, "temporary"),
            AddressVersion::Old => write!(f, "old"),
        }
    }
}

/// Extended private key plus the phrase it came from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    /// Serialized `xprv`
    secret: String,
    seed: String,
}

impl MasterKey {
    pub fn seed_phrase(&self) -> &str {
        &self.seed
    }

    fn extended_key(&self) -> Result<XPrv> {
        self.secret
            .parse::<XPrv>()
            .map_err(|e| WalletError::DerivationFailed(format!("Corrupt master key: {e}")))
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    address: String,
    public_key: [u8; PUBLIC_KEY_LEN],
    secret_key: [u8; SECRET_KEY_LEN],
    #[zeroize(skip)]
    version: AddressVersion,
}

impl KeyPair {
    pub fn from_secret_key(secret_key: [u8; SECRET_KEY_LEN], version: AddressVersion) -> KeyPair {
        let public_key = ed25519_public_key(&secret_key);
        KeyPair {
            address: construct_address(&public_key, version),
            public_key,
            secret_key,
            version,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        hex_encode(&self.public_key)
    }

    pub fn secret_key(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.secret_key
    }

    pub fn version(&self) -> AddressVersion {
        self.version
    }

    /// Hex-encoded detached signature over `message`
    pub fn sign_message(&self, message: &[u8]) -> String {
        hex_encode(&ed25519_sign(&self.secret_key, message))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Verify a hex-encoded signature against a hex-encoded public key
pub fn verify_message(public_key_hex: &str, signature_hex: &str, message: &[u8]) -> bool {
    match (hex_decode(public_key_hex), hex_decode(signature_hex)) {
        (Ok(public_key), Ok(signature)) => ed25519_verify(&public_key, &signature, message),
        _ => false,
    }
}

/// Symmetric key bytes for the envelope cipher.
///
/// The first 32 characters of the SHA3-256 hex digest, taken as ASCII bytes.
pub fn derive_passphrase_key(passphrase: &str) -> [u8; 32] {
    let digest = sha3_256_hex(passphrase.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest.as_bytes()[..32]);
    key
}

pub fn generate_seed_phrase() -> Result<String> {
    let mnemonic = Mnemonic::generate(SEED_PHRASE_WORDS)
        .map_err(|e| WalletError::InvalidSeedPhrase(e.to_string()))?;
    Ok(mnemonic.to_string())
}

pub fn validate_seed_phrase(seed_phrase: &str) -> bool {
    Mnemonic::parse(seed_phrase).is_ok()
}

pub fn derive_master_key(seed_phrase: &str, passphrase: Option<&str>) -> Result<MasterKey> {
    let mnemonic = Mnemonic::parse(seed_phrase)
        .map_err(|e| WalletError::InvalidSeedPhrase(e.to_string()))?;
    let mut seed = mnemonic.to_seed(passphrase.unwrap_or(""));
    let extended = XPrv::new(seed);
    seed.zeroize();
    let extended = extended.map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    Ok(MasterKey {
        secret: (*extended.to_string(Prefix::XPRV)).clone(),
        seed: mnemonic.to_string(),
    })
}

pub fn derive_child_keypair(
    master_key: &MasterKey,
    depth: u32,
    version: AddressVersion,
) -> Result<KeyPair> {
    let child_number = ChildNumber::new(depth, true)
        .map_err(|e| WalletError::DerivationFailed(format!("depth {depth}: {e}")))?;
    let child = master_key
        .extended_key()?
        .derive_child(child_number)
        .map_err(|e| WalletError::DerivationFailed(format!("depth {depth}: {e}")))?;
    Ok(KeyPair::from_secret_key(child.to_bytes(), version))
}

pub fn construct_address(public_key: &[u8], version: AddressVersion) -> String {
    match version {
        AddressVersion::Latest => construct_default_address(public_key),
        AddressVersion::Temporary => construct_temp_address(public_key),
        AddressVersion::Old => construct_old_address(public_key),
    }
}

fn construct_default_address(public_key: &[u8]) -> String {
    sha3_256_hex(public_key)
}

// The temporary scheme read the base64 text back as if it were hex, pair by
// pair, with parseInt rules. Non-hex pairs collapse to zero bytes.
fn construct_temp_address(public_key: &[u8]) -> String {
    let encoded = BASE64.encode(public_key);
    let bytes: Vec<u8> = encoded
        .as_bytes()
        .chunks(2)
        .map(parse_int_hex_pair)
        .collect();
    sha3_256_hex(&bytes)
}

fn parse_int_hex_pair(pair: &[u8]) -> u8 {
    let digits = pair.strip_prefix(b"+").unwrap_or(pair);
    let mut value = 0u8;
    for digit in digits {
        match (*digit as char).to_digit(16) {
            Some(d) => value = value * 16 + d as u8,
            None => break,
        }
    }
    value
}

// Legacy addresses hashed the length-prefixed key and kept half the digest.
fn construct_old_address(public_key: &[u8]) -> String {
    let mut payload = (public_key.len() as u64).to_le_bytes().to_vec();
    payload.extend_from_slice(public_key);
    let mut address = sha3_256_hex(&payload);
    address.truncate(OLD_ADDRESS_LEN);
    address
}

/// First key-pair whose address is not already in `known_addresses`.
///
/// Starts at `depth = known_addresses.len()` and gives up after
/// `max_attempts` collisions.
pub fn generate_next_unused_keypair(
    master_key: &MasterKey,
    version: AddressVersion,
    known_addresses: &[String],
    max_attempts: u32,
) -> Result<KeyPair> {
    let known: HashSet<&str> = known_addresses.iter().map(String::as_str).collect();
    let start = u32::try_from(known_addresses.len())
        .map_err(|_| WalletError::DerivationFailed("too many known addresses".to_string()))?;

    for attempt in 0..max_attempts {
        let depth = start.checked_add(attempt).ok_or_else(|| {
            WalletError::DerivationFailed("derivation depth overflow".to_string())
        })?;
        let keypair = derive_child_keypair(master_key, depth, version)?;
        if !known.contains(keypair.address()) {
            log::debug!("Derived unused {version} address at depth {depth}");
            return Ok(keypair);
        }
    }

    Err(WalletError::DerivationFailed(format!(
        "no unused address within {max_attempts} depths of {start}"
    )))
}

/// Gap-limit scan recovering the key-pairs behind `candidate_addresses`.
///
/// Each depth is tested under the latest and temporary schemes. A hit resets
/// the miss streak; the scan stops after `gap_threshold` consecutive misses
/// or once every candidate has been found.
pub fn regenerate_addresses(
    master_key: &MasterKey,
    candidate_addresses: &[String],
    gap_threshold: u32,
) -> Result<Vec<KeyPair>> {
    let candidates: HashSet<&str> = candidate_addresses.iter().map(String::as_str).collect();
    let mut found: Vec<KeyPair> = Vec::new();
    let mut found_addresses: HashSet<String> = HashSet::new();
    let mut miss_streak = 0u32;
    let mut depth = 0u32;

    while miss_streak < gap_threshold && found_addresses.len() < candidates.len() {
        let mut hit = false;
        for version in [AddressVersion::Latest, AddressVersion::Temporary] {
            let keypair = derive_child_keypair(master_key, depth, version)?;
            if candidates.contains(keypair.address())
                && found_addresses.insert(keypair.address().to_string())
            {
                found.push(keypair);
                hit = true;
            }
        }

        if hit {
            miss_streak = 0;
        } else {
            miss_streak += 1;
        }
        depth = depth
            .checked_add(1)
            .ok_or_else(|| WalletError::DerivationFailed("derivation depth overflow".to_string()))?;
    }

    if found.is_empty() {
        return Err(WalletError::AddressRegenerationExhausted);
    }
    log::info!(
        "Regenerated {} of {} addresses after scanning {depth} depths",
        found.len(),
        candidates.len()
    );
    Ok(found)
}

pub fn regenerate_addresses_from_seed(
    seed_phrase: &str,
    passphrase: Option<&str>,
    candidate_addresses: &[String],
    gap_threshold: u32,
) -> Result<Vec<KeyPair>> {
    let master_key = derive_master_key(seed_phrase, passphrase)?;
    regenerate_addresses(&master_key, candidate_addresses, gap_threshold)
}
