// Assets carried by transaction outputs.
// Tokens are one fungible pool. Items are only fungible with other items of
// the same DRS transaction hash, so every operation checks compatibility
// first and refuses to coerce.

use crate::error::{Result, WalletError};
use crate::utils::sha3_256_hex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Token(u64),
    Item(ItemAsset),
}

/// A tracked asset bound to a data-receipt-scheme transaction hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAsset {
    pub amount: u64,
    pub drs_tx_hash: String,
    pub metadata: Option<String>,
}

impl Asset {
    pub fn token(amount: u64) -> Asset {
        Asset::Token(amount)
    }

    pub fn item(amount: u64, drs_tx_hash: impl Into<String>, metadata: Option<String>) -> Asset {
        Asset::Item(ItemAsset {
            amount,
            drs_tx_hash: drs_tx_hash.into(),
            metadata,
        })
    }

    pub fn amount(&self) -> u64 {
        match self {
            Asset::Token(amount) => *amount,
            Asset::Item(item) => item.amount,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Asset::Token(_) => "Token",
            Asset::Item(_) => "Item",
        }
    }

    pub fn drs_tx_hash(&self) -> Option<&str> {
        match self {
            Asset::Token(_) => None,
            Asset::Item(item) => Some(item.drs_tx_hash.as_str()),
        }
    }

    pub fn is_compatible(&self, other: &Asset) -> bool {
        match (self, other) {
            (Asset::Token(_), Asset::Token(_)) => true,
            (Asset::Item(lhs), Asset::Item(rhs)) => lhs.drs_tx_hash == rhs.drs_tx_hash,
            _ => false,
        }
    }

    /// Zero amount of the same asset class as `self`
    pub fn zero_like(&self) -> Asset {
        self.with_amount(0)
    }

    fn with_amount(&self, amount: u64) -> Asset {
        match self {
            Asset::Token(_) => Asset::Token(amount),
            Asset::Item(item) => Asset::Item(ItemAsset {
                amount,
                drs_tx_hash: item.drs_tx_hash.clone(),
                metadata: item.metadata.clone(),
            }),
        }
    }

    fn ensure_compatible(&self, other: &Asset) -> Result<()> {
        if self.is_compatible(other) {
            return Ok(());
        }
        Err(WalletError::AssetsIncompatible(format!(
            "{self} cannot be combined with {other}"
        )))
    }

    pub fn add(&self, other: &Asset) -> Result<Asset> {
        self.ensure_compatible(other)?;
        let amount = self.amount().checked_add(other.amount()).ok_or_else(|| {
            WalletError::InvalidInputs(vec![format!("{self} + {other} overflows")])
        })?;
        Ok(self.with_amount(amount))
    }

    pub fn sub(&self, other: &Asset) -> Result<Asset> {
        self.ensure_compatible(other)?;
        let amount = self.amount().checked_sub(other.amount()).ok_or(
            WalletError::InsufficientFunds {
                required: other.amount(),
                available: self.amount(),
            },
        )?;
        Ok(self.with_amount(amount))
    }

    pub fn gte(&self, other: &Asset) -> Result<bool> {
        self.ensure_compatible(other)?;
        Ok(self.amount() >= other.amount())
    }

    pub fn gt(&self, other: &Asset) -> Result<bool> {
        self.ensure_compatible(other)?;
        Ok(self.amount() > other.amount())
    }

    pub fn lt(&self, other: &Asset) -> Result<bool> {
        self.ensure_compatible(other)?;
        Ok(self.amount() < other.amount())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Token(amount) => write!(f, "Token({amount})"),
            Asset::Item(item) => write!(f, "Item({}, {})", item.amount, item.drs_tx_hash),
        }
    }
}

/// Hash signed when an item asset is created.
///
/// Covers only the type tag and amount; the DRS hash is assigned by the
/// ledger at creation time and metadata is not bound.
pub fn signable_asset_hash(asset: &Asset) -> String {
    sha3_256_hex(format!("{}:{}", asset.type_tag(), asset.amount()).as_bytes())
}

/// Running totals per asset class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTotals {
    pub tokens: u64,
    pub items: BTreeMap<String, u64>,
}

impl AssetTotals {
    pub fn record(&mut self, asset: &Asset) -> Result<()> {
        let slot = match asset {
            Asset::Token(_) => &mut self.tokens,
            Asset::Item(item) => self.items.entry(item.drs_tx_hash.clone()).or_insert(0),
        };
        *slot = slot.checked_add(asset.amount()).ok_or_else(|| {
            WalletError::InvalidInputs(vec![format!("running total for {asset} overflows")])
        })?;
        Ok(())
    }

    /// Everything available in the same class as `asset`
    pub fn available(&self, asset: &Asset) -> u64 {
        match asset {
            Asset::Token(_) => self.tokens,
            Asset::Item(item) => self.items.get(&item.drs_tx_hash).copied().unwrap_or(0),
        }
    }
}
