// Spend scripts for the ledger's stack machine.
// The ledger re-executes these, so the entry order and the hash opcode chosen
// per address version must match what it expects byte for byte.

use crate::core::transaction::{OutPoint, ScriptSignature, TxIn};
use crate::error::{Result, WalletError};
use crate::utils::{hex_decode, hex_encode, sha3_256_hex};
use crate::wallet::{construct_address, AddressVersion};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DRUID_PREFIX: &str = "DRUID0x";
pub const DRUID_HASH_LEN: usize = 9;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    OP_DUP,
    OP_HASH256,
    OP_HASH256_V0,
    OP_HASH256_TEMP,
    OP_EQUALVERIFY,
    OP_CHECKSIG,
}

impl OpCode {
    /// Hash opcode matching an address scheme
    pub fn hash_for(version: AddressVersion) -> OpCode {
        match version {
            AddressVersion::Latest => OpCode::OP_HASH256,
            AddressVersion::Temporary => OpCode::OP_HASH256_TEMP,
            AddressVersion::Old => OpCode::OP_HASH256_V0,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackEntry {
    Op(OpCode),
    Bytes(String),
    Signature(String),
    PubKey(String),
    PubKeyHash(String),
}

impl fmt::Display for StackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackEntry::Op(op) => write!(f, "{op}"),
            StackEntry::Bytes(data)
            | StackEntry::Signature(data)
            | StackEntry::PubKey(data)
            | StackEntry::PubKeyHash(data) => write!(f, "{data}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub stack: Vec<StackEntry>,
}

impl Script {
    pub fn entries(&self) -> &[StackEntry] {
        &self.stack
    }
}

/// Entries joined with `-`
impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, entry) in self.stack.iter().enumerate() {
            if idx > 0 {
                f.write_str("-")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

/// Hash each input signs: `sha3("{n}-{t_hash}")`
pub fn signable_data(out_point: &OutPoint) -> String {
    sha3_256_hex(out_point.to_string().as_bytes())
}

/// Pay-to-public-key-hash unlocking script.
///
/// `public_key` is hex; the committed hash is recomputed from it under
/// `address_version` so the ledger's `EQUALVERIFY` sees the spender's address.
pub fn p2pkh(
    check_data: &str,
    signature: &str,
    public_key: &str,
    address_version: AddressVersion,
) -> Result<Script> {
    let public_key_bytes = hex_decode(public_key)?;
    let public_key_hash = construct_address(&public_key_bytes, address_version);

    Ok(Script {
        stack: vec![
            StackEntry::Bytes(check_data.to_string()),
            StackEntry::Signature(signature.to_string()),
            StackEntry::PubKey(public_key.to_string()),
            StackEntry::Op(OpCode::OP_DUP),
            StackEntry::Op(OpCode::hash_for(address_version)),
            StackEntry::PubKeyHash(public_key_hash),
            StackEntry::Op(OpCode::OP_EQUALVERIFY),
            StackEntry::Op(OpCode::OP_CHECKSIG),
        ],
    })
}

/// Signed `TxIn` spending `out_point` with the key behind `public_key`
pub fn build_signed_tx_in(
    out_point: OutPoint,
    secret_key: &[u8; 32],
    public_key: &[u8; 32],
    address_version: AddressVersion,
) -> TxIn {
    let check_data = signable_data(&out_point);
    let signature = hex_encode(&crate::utils::ed25519_sign(secret_key, check_data.as_bytes()));
    TxIn {
        previous_out: Some(out_point),
        script_signature: ScriptSignature::Pay2PkH {
            signable_data: check_data,
            signature,
            public_key: hex_encode(public_key),
            address_version,
        },
    }
}

/// The "from" digest binding a swap half to the inputs that fund it.
///
/// Every input's rebuilt P2PKH script is formatted as
/// `"{n}-{t_hash}-{script}"` (or `"null-{script}"`), the parts are joined
/// with `-` and hashed.
pub fn construct_tx_ins_address(tx_ins: &[TxIn]) -> Result<String> {
    let mut parts = Vec::with_capacity(tx_ins.len());
    for tx_in in tx_ins {
        let ScriptSignature::Pay2PkH {
            signable_data,
            signature,
            public_key,
            address_version,
        } = &tx_in.script_signature;
        let script = p2pkh(signable_data, signature, public_key, *address_version)?;
        let out_point = match &tx_in.previous_out {
            Some(out_point) => out_point.to_string(),
            None => "null".to_string(),
        };
        parts.push(format!("{out_point}-{script}"));
    }
    Ok(sha3_256_hex(parts.join("-").as_bytes()))
}

/// Fresh swap identifier, `DRUID0x` plus nine hex characters
pub fn generate_druid() -> String {
    let hash = sha3_256_hex(Uuid::new_v4().to_string().as_bytes());
    format!("{DRUID_PREFIX}{}", &hash[..DRUID_HASH_LEN])
}

pub fn validate_druid(druid: &str) -> Result<()> {
    let valid = druid.len() == DRUID_PREFIX.len() + DRUID_HASH_LEN
        && druid.starts_with(DRUID_PREFIX)
        && druid[DRUID_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(WalletError::InvalidDruid(druid.to_string()))
    }
}
