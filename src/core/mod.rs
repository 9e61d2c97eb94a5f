//! Ledger-facing primitives
//!
//! Assets and their arithmetic, the transaction shapes the ledger accepts,
//! P2PKH spend scripts, and the selection/assembly pipeline that turns a
//! balance snapshot into a signed transaction.

pub mod asset;
pub mod balance;
pub mod builder;
pub mod script;
pub mod transaction;

pub use asset::{signable_asset_hash, Asset, AssetTotals, ItemAsset};
pub use balance::{AddressBalance, BalanceSnapshot, SpendableOutput};
pub use builder::{
    assemble_transaction, create_simple_payment, select_inputs, CreatedTransaction,
    InputSelection,
};
pub use script::{
    build_signed_tx_in, construct_tx_ins_address, generate_druid, p2pkh, signable_data,
    validate_druid, OpCode, Script, StackEntry, DRUID_HASH_LEN, DRUID_PREFIX,
};
pub use transaction::{
    DdeValues, DruidExpectation, OutPoint, ScriptSignature, Transaction, TxIn, TxOut,
    DDE_PARTICIPANTS, NETWORK_VERSION,
};
