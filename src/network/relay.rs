// Relay contract for swap bookkeeping.
// Records live under `(address, field)` where the field is the DRUID. Anyone
// holding a valid signature for some address may write to any address, but
// only the owner of an address may read or delete what is stored under it.

use crate::core::DruidExpectation;
use crate::error::Result;
use crate::wallet::{construct_address, verify_message, AddressVersion, KeyPair};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelayKey {
    pub address: String,
    pub field: String,
}

impl RelayKey {
    pub fn new(address: impl Into<String>, field: impl Into<String>) -> RelayKey {
        RelayKey {
            address: address.into(),
            field: field.into(),
        }
    }
}

/// Proof that the caller holds the key behind `address`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAuth {
    pub address: String,
    pub public_key: String,
    /// Signature over the address text
    pub signature: String,
    pub version: AddressVersion,
}

impl RelayAuth {
    pub fn sign(keypair: &KeyPair) -> RelayAuth {
        RelayAuth {
            address: keypair.address().to_string(),
            public_key: keypair.public_key_hex(),
            signature: keypair.sign_message(keypair.address().as_bytes()),
            version: keypair.version(),
        }
    }

    /// The key must hash to the address and the signature must cover it
    pub fn verify(&self) -> bool {
        let Ok(public_key) = crate::utils::hex_decode(&self.public_key) else {
            return false;
        };
        construct_address(&public_key, self.version) == self.address
            && verify_message(&self.public_key, &self.signature, self.address.as_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Rejected => "rejected",
        };
        f.write_str(text)
    }
}

/// Relay-held state of one two-party swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingExchange {
    pub druid: String,
    /// What the initiator receives; the responder fills in `from`
    pub sender_expectation: DruidExpectation,
    /// What the responder receives; `from` is the initiator's input digest
    pub receiver_expectation: DruidExpectation,
    pub status: ExchangeStatus,
    /// Ledger host both halves settle on
    pub compute_host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub key: RelayKey,
    pub exchange: PendingExchange,
}

#[async_trait]
pub trait Relay: Send + Sync {
    /// Every record stored under `auth.address`
    async fn get_records(&self, auth: &RelayAuth) -> Result<Vec<RelayRecord>>;

    /// Insert or overwrite records under any address
    async fn set_records(&self, auth: &RelayAuth, records: Vec<RelayRecord>) -> Result<()>;

    /// Remove records under `auth.address`; missing keys are not an error
    async fn delete_records(&self, auth: &RelayAuth, keys: Vec<RelayKey>) -> Result<()>;
}
