use crate::core::asset::{Asset, AssetTotals};
use crate::core::transaction::OutPoint;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendableOutput {
    pub out_point: OutPoint,
    pub value: Asset,
}

/// Unspent outputs held by one address, in ledger order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBalance {
    pub address: String,
    pub outputs: Vec<SpendableOutput>,
}

/// Point-in-time view of what a set of addresses can spend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub total: AssetTotals,
    pub address_list: Vec<AddressBalance>,
}

impl BalanceSnapshot {
    /// Build a snapshot and its totals from per-address outputs
    pub fn from_addresses(address_list: Vec<AddressBalance>) -> Result<BalanceSnapshot> {
        let mut total = AssetTotals::default();
        for entry in &address_list {
            for output in &entry.outputs {
                total.record(&output.value)?;
            }
        }
        Ok(BalanceSnapshot {
            total,
            address_list,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.address_list.iter().all(|entry| entry.outputs.is_empty())
    }
}
