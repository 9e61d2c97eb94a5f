// Coin selection and transaction assembly.
// Selection walks the snapshot in the order the ledger returned it and keeps
// taking compatible outputs until the target is covered. Assembly then pays
// the target and returns the exact remainder as a single change output, so
// inputs and outputs always balance per asset class.

use crate::core::asset::Asset;
use crate::core::balance::BalanceSnapshot;
use crate::core::script::build_signed_tx_in;
use crate::core::transaction::{DdeValues, Transaction, TxIn, TxOut, NETWORK_VERSION};
use crate::error::{Result, WalletError};
use crate::wallet::KeyPair;
use std::collections::HashMap;

/// Inputs gathered to cover a target amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSelection {
    pub inputs: Vec<TxIn>,
    pub total_gathered: Asset,
    /// Addresses that contributed at least one input
    pub used_addresses: Vec<String>,
    /// Addresses whose every output was consumed
    pub depleted_addresses: Vec<String>,
}

/// A ready-to-submit transaction plus the bookkeeping callers act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    /// True only when a change output was written to the excess address
    pub excess_used: bool,
    pub used_addresses: Vec<String>,
    pub depleted_addresses: Vec<String>,
}

pub fn select_inputs(
    target: &Asset,
    balance: &BalanceSnapshot,
    keypairs: &HashMap<String, KeyPair>,
) -> Result<InputSelection> {
    let available = balance.total.available(target);
    if available < target.amount() {
        return Err(WalletError::InsufficientFunds {
            required: target.amount(),
            available,
        });
    }

    let mut inputs = Vec::new();
    let mut failures = Vec::new();
    let mut total_gathered = target.zero_like();
    let mut used_addresses = Vec::new();
    let mut depleted_addresses = Vec::new();

    for entry in &balance.address_list {
        let mut consumed = 0usize;
        for output in &entry.outputs {
            if !output.value.is_compatible(target) || total_gathered.gte(target)? {
                continue;
            }

            let Some(keypair) = keypairs.get(&entry.address) else {
                failures.push(
                    WalletError::KeypairNotFound(entry.address.clone()).to_string(),
                );
                continue;
            };

            inputs.push(build_signed_tx_in(
                output.out_point.clone(),
                keypair.secret_key(),
                keypair.public_key(),
                keypair.version(),
            ));
            total_gathered = total_gathered.add(&output.value)?;
            consumed += 1;
        }

        if consumed > 0 {
            used_addresses.push(entry.address.clone());
            if consumed == entry.outputs.len() {
                depleted_addresses.push(entry.address.clone());
            }
        }
    }

    if !failures.is_empty() {
        return Err(WalletError::InvalidInputs(failures));
    }
    if inputs.is_empty() {
        return Err(WalletError::NoInputs);
    }
    // Snapshot totals can disagree with the listed outputs
    if total_gathered.lt(target)? {
        return Err(WalletError::InsufficientFunds {
            required: target.amount(),
            available: total_gathered.amount(),
        });
    }

    log::debug!(
        "Selected {} inputs from {} addresses totalling {total_gathered}",
        inputs.len(),
        used_addresses.len()
    );

    Ok(InputSelection {
        inputs,
        total_gathered,
        used_addresses,
        depleted_addresses,
    })
}

pub fn assemble_transaction(
    payment_address: &str,
    payment_asset: &Asset,
    excess_address: &str,
    druid_info: Option<DdeValues>,
    selection: InputSelection,
) -> Result<CreatedTransaction> {
    let mut outputs = vec![TxOut::pay(payment_asset.clone(), payment_address)];

    let excess_used = selection.total_gathered.gt(payment_asset)?;
    if excess_used {
        let change = selection.total_gathered.sub(payment_asset)?;
        outputs.push(TxOut::pay(change, excess_address));
    } else if selection.total_gathered.lt(payment_asset)? {
        return Err(WalletError::InsufficientFunds {
            required: payment_asset.amount(),
            available: selection.total_gathered.amount(),
        });
    }

    Ok(CreatedTransaction {
        transaction: Transaction {
            inputs: selection.inputs,
            outputs,
            version: NETWORK_VERSION,
            druid_info,
        },
        excess_used,
        used_addresses: selection.used_addresses,
        depleted_addresses: selection.depleted_addresses,
    })
}

/// Single-party payment: select, then assemble without swap data
pub fn create_simple_payment(
    payment_address: &str,
    payment_asset: &Asset,
    excess_address: &str,
    balance: &BalanceSnapshot,
    keypairs: &HashMap<String, KeyPair>,
) -> Result<CreatedTransaction> {
    let selection = select_inputs(payment_asset, balance, keypairs)?;
    assemble_transaction(payment_address, payment_asset, excess_address, None, selection)
}
