use crate::core::{BalanceSnapshot, Transaction};
use crate::error::{Result, WalletError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A ledger node's reply to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub reason: String,
}

impl SubmitResponse {
    pub fn accepted() -> SubmitResponse {
        SubmitResponse {
            success: true,
            reason: "Transactions processed".to_string(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> SubmitResponse {
        SubmitResponse {
            success: false,
            reason: reason.into(),
        }
    }

    /// Unsuccessful replies become `WalletError::Ledger`
    pub fn into_result(self) -> Result<SubmitResponse> {
        if self.success {
            Ok(self)
        } else {
            Err(WalletError::Ledger(self.reason))
        }
    }
}

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Unspent outputs for `addresses`, grouped per address in ledger order
    async fn fetch_balance(&self, addresses: &[String]) -> Result<BalanceSnapshot>;
}

#[async_trait]
pub trait LedgerSubmitter: Send + Sync {
    async fn submit_transactions(
        &self,
        host: &str,
        transactions: Vec<Transaction>,
    ) -> Result<SubmitResponse>;
}
