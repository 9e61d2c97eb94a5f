// Transaction shapes the ledger accepts from wallets.
// Field names follow the ledger's JSON so these serialize straight onto the
// wire; the same structs go through bincode when wrapped in an envelope.

use crate::core::asset::Asset;
use crate::wallet::AddressVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction format version understood by the ledger
pub const NETWORK_VERSION: u32 = 2;
/// Both sides of a dual double-entry swap
pub const DDE_PARTICIPANTS: usize = 2;

/// Reference to a spendable output of an earlier transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    #[serde(rename = "t_hash")]
    pub transaction_hash: String,
    #[serde(rename = "n")]
    pub output_index: u32,
}

impl OutPoint {
    pub fn new(transaction_hash: impl Into<String>, output_index: u32) -> OutPoint {
        OutPoint {
            transaction_hash: transaction_hash.into(),
            output_index,
        }
    }
}

/// `"{n}-{t_hash}"`, the form that gets hashed and signed
impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.output_index, self.transaction_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptSignature {
    Pay2PkH {
        signable_data: String,
        signature: String,
        public_key: String,
        address_version: AddressVersion,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_out: Option<OutPoint>,
    pub script_signature: ScriptSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: Asset,
    pub locktime: u64,
    pub drs_block_hash: Option<String>,
    pub script_public_key: Option<String>,
}

impl TxOut {
    /// Unlocked output paying `value` to `address`
    pub fn pay(value: Asset, address: impl Into<String>) -> TxOut {
        TxOut {
            value,
            locktime: 0,
            drs_block_hash: None,
            script_public_key: Some(address.into()),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.script_public_key.as_deref()
    }
}

/// What one side of a swap must receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DruidExpectation {
    /// Digest of the inputs funding this payment; empty until known
    pub from: String,
    pub to: String,
    pub asset: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdeValues {
    pub druid: String,
    pub participants: usize,
    pub expectations: Vec<DruidExpectation>,
}

impl DdeValues {
    pub fn new(druid: impl Into<String>, expectation: DruidExpectation) -> DdeValues {
        DdeValues {
            druid: druid.into(),
            participants: DDE_PARTICIPANTS,
            expectations: vec![expectation],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub version: u32,
    pub druid_info: Option<DdeValues>,
}

impl Transaction {
    pub fn druid(&self) -> Option<&str> {
        self.druid_info.as_ref().map(|info| info.druid.as_str())
    }

    /// Output totals for one asset class
    pub fn output_value_like(&self, asset: &Asset) -> u64 {
        self.outputs
            .iter()
            .filter(|out| out.value.is_compatible(asset))
            .map(|out| out.value.amount())
            .sum()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
