//! In-memory ledger and relay for exercising wallets without a network

use crate::core::{
    AddressBalance, Asset, BalanceSnapshot, OutPoint, SpendableOutput, Transaction,
};
use crate::error::{Result, WalletError};
use crate::network::{
    BalanceProvider, LedgerSubmitter, Relay, RelayAuth, RelayKey, RelayRecord, SubmitResponse,
};
use crate::utils::{serialize, sha3_256_hex};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| WalletError::Io(format!("{what} lock poisoned")))
}

/// One accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub host: String,
    pub transaction: Transaction,
}

/// Ledger that settles every submission immediately.
///
/// Spent outpoints disappear from the balance and each output becomes a new
/// spendable outpoint under the hash of the transaction that created it.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    utxos: Mutex<BTreeMap<String, Vec<SpendableOutput>>>,
    submissions: Mutex<Vec<Submission>>,
    rejection: Mutex<Option<String>>,
}

impl MemoryLedger {
    pub fn new() -> MemoryLedger {
        MemoryLedger::default()
    }

    /// Credit `address` with a fresh outpoint worth `value`
    pub fn fund(&self, address: &str, value: Asset) -> Result<OutPoint> {
        let mut utxos = lock(&self.utxos, "ledger")?;
        let entry = utxos.entry(address.to_string()).or_default();
        let seed = format!("genesis-{address}-{}", entry.len());
        let out_point = OutPoint::new(sha3_256_hex(seed.as_bytes()), 0);
        entry.push(SpendableOutput {
            out_point: out_point.clone(),
            value,
        });
        Ok(out_point)
    }

    /// Make every following submission fail with `reason`
    pub fn reject_with(&self, reason: Option<&str>) -> Result<()> {
        *lock(&self.rejection, "ledger")? = reason.map(str::to_string);
        Ok(())
    }

    pub fn submissions(&self) -> Result<Vec<Submission>> {
        Ok(lock(&self.submissions, "ledger")?.clone())
    }

    /// Sum of everything held by `address` in the class of `like`
    pub fn balance_of(&self, address: &str, like: &Asset) -> Result<u64> {
        let utxos = lock(&self.utxos, "ledger")?;
        Ok(utxos
            .get(address)
            .map(|outputs| {
                outputs
                    .iter()
                    .filter(|o| o.value.is_compatible(like))
                    .map(|o| o.value.amount())
                    .sum()
            })
            .unwrap_or(0))
    }

    fn settle(utxos: &mut BTreeMap<String, Vec<SpendableOutput>>, tx: &Transaction) -> Result<()> {
        let spent: Vec<&OutPoint> = tx.inputs.iter().filter_map(|i| i.previous_out.as_ref()).collect();
        for outputs in utxos.values_mut() {
            outputs.retain(|o| !spent.contains(&&o.out_point));
        }

        let tx_hash = sha3_256_hex(&serialize(tx)?);
        for (n, output) in tx.outputs.iter().enumerate() {
            let Some(address) = output.address() else {
                continue;
            };
            let index = u32::try_from(n)
                .map_err(|_| WalletError::Ledger("too many outputs".to_string()))?;
            utxos.entry(address.to_string()).or_default().push(SpendableOutput {
                out_point: OutPoint::new(tx_hash.clone(), index),
                value: output.value.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BalanceProvider for MemoryLedger {
    async fn fetch_balance(&self, addresses: &[String]) -> Result<BalanceSnapshot> {
        let utxos = lock(&self.utxos, "ledger")?;
        let address_list = addresses
            .iter()
            .filter_map(|address| {
                utxos.get(address).filter(|o| !o.is_empty()).map(|outputs| AddressBalance {
                    address: address.clone(),
                    outputs: outputs.clone(),
                })
            })
            .collect();
        BalanceSnapshot::from_addresses(address_list)
    }
}

#[async_trait]
impl LedgerSubmitter for MemoryLedger {
    async fn submit_transactions(
        &self,
        host: &str,
        transactions: Vec<Transaction>,
    ) -> Result<SubmitResponse> {
        if let Some(reason) = lock(&self.rejection, "ledger")?.clone() {
            return Ok(SubmitResponse::rejected(reason));
        }

        let mut utxos = lock(&self.utxos, "ledger")?;
        let mut submissions = lock(&self.submissions, "ledger")?;
        for transaction in transactions {
            Self::settle(&mut utxos, &transaction)?;
            submissions.push(Submission {
                host: host.to_string(),
                transaction,
            });
        }
        Ok(SubmitResponse::accepted())
    }
}

/// Relay that checks every caller's signature
#[derive(Debug, Default)]
pub struct MemoryRelay {
    records: Mutex<BTreeMap<RelayKey, RelayRecord>>,
}

impl MemoryRelay {
    pub fn new() -> MemoryRelay {
        MemoryRelay::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(lock(&self.records, "relay")?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn authorize(auth: &RelayAuth) -> Result<()> {
        if auth.verify() {
            Ok(())
        } else {
            Err(WalletError::Relay(format!("unauthorized caller for {}", auth.address)))
        }
    }
}

#[async_trait]
impl Relay for MemoryRelay {
    async fn get_records(&self, auth: &RelayAuth) -> Result<Vec<RelayRecord>> {
        Self::authorize(auth)?;
        let records = lock(&self.records, "relay")?;
        Ok(records
            .values()
            .filter(|record| record.key.address == auth.address)
            .cloned()
            .collect())
    }

    async fn set_records(&self, auth: &RelayAuth, new_records: Vec<RelayRecord>) -> Result<()> {
        Self::authorize(auth)?;
        let mut records = lock(&self.records, "relay")?;
        for record in new_records {
            records.insert(record.key.clone(), record);
        }
        Ok(())
    }

    async fn delete_records(&self, auth: &RelayAuth, keys: Vec<RelayKey>) -> Result<()> {
        Self::authorize(auth)?;
        if let Some(foreign) = keys.iter().find(|key| key.address != auth.address) {
            return Err(WalletError::Relay(format!(
                "{} may not delete records of {}",
                auth.address, foreign.address
            )));
        }
        let mut records = lock(&self.records, "relay")?;
        for key in keys {
            records.remove(&key);
        }
        Ok(())
    }
}

/// Key-pairs indexed by address, the shape selection expects
pub fn keypair_map<I>(keypairs: I) -> HashMap<String, crate::wallet::KeyPair>
where
    I: IntoIterator<Item = crate::wallet::KeyPair>,
{
    keypairs
        .into_iter()
        .map(|keypair| (keypair.address().to_string(), keypair))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{create_simple_payment, DruidExpectation};
    use crate::network::{ExchangeStatus, PendingExchange};
    use crate::wallet::{AddressVersion, KeyPair};

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_ledger_settles_payments() {
        let ledger = MemoryLedger::new();
        let payer = KeyPair::from_secret_key([1u8; 32], AddressVersion::Latest);
        ledger.fund(payer.address(), Asset::token(100)).unwrap();

        let addresses = vec![payer.address().to_string()];
        let snapshot = block_on(ledger.fetch_balance(&addresses)).unwrap();
        assert_eq!(snapshot.total.tokens, 100);

        let keypairs = keypair_map([payer.clone()]);
        let created =
            create_simple_payment("payee", &Asset::token(30), payer.address(), &snapshot, &keypairs)
                .unwrap();
        block_on(ledger.submit_transactions("host", vec![created.transaction])).unwrap();

        assert_eq!(ledger.balance_of("payee", &Asset::token(0)).unwrap(), 30);
        assert_eq!(ledger.balance_of(payer.address(), &Asset::token(0)).unwrap(), 70);
        assert_eq!(ledger.submissions().unwrap()[0].host, "host");
    }

    #[test]
    fn test_ledger_rejection() {
        let ledger = MemoryLedger::new();
        ledger.reject_with(Some("offline")).unwrap();
        let response = block_on(ledger.submit_transactions("host", vec![])).unwrap();
        assert!(!response.success);
        assert!(ledger.submissions().unwrap().is_empty());
    }

    #[test]
    fn test_relay_enforces_ownership() {
        let relay = MemoryRelay::new();
        let owner = KeyPair::from_secret_key([1u8; 32], AddressVersion::Latest);
        let writer = KeyPair::from_secret_key([2u8; 32], AddressVersion::Latest);
        let expectation = DruidExpectation {
            from: String::new(),
            to: owner.address().to_string(),
            asset: Asset::token(1),
        };
        let record = RelayRecord {
            key: RelayKey::new(owner.address(), "DRUID0x123456789"),
            exchange: PendingExchange {
                druid: "DRUID0x123456789".to_string(),
                sender_expectation: expectation.clone(),
                receiver_expectation: expectation,
                status: ExchangeStatus::Pending,
                compute_host: "host".to_string(),
            },
        };

        let writer_auth = RelayAuth::sign(&writer);
        block_on(relay.set_records(&writer_auth, vec![record.clone()])).unwrap();
        assert!(block_on(relay.get_records(&writer_auth)).unwrap().is_empty());
        assert!(matches!(
            block_on(relay.delete_records(&writer_auth, vec![record.key.clone()])),
            Err(WalletError::Relay(_))
        ));

        let owner_auth = RelayAuth::sign(&owner);
        assert_eq!(block_on(relay.get_records(&owner_auth)).unwrap(), vec![record.clone()]);
        block_on(relay.delete_records(&owner_auth, vec![record.key.clone()])).unwrap();
        assert!(relay.is_empty().unwrap());

        let mut forged = owner_auth;
        forged.signature = writer.sign_message(owner.address().as_bytes());
        assert!(matches!(
            block_on(relay.get_records(&forged)),
            Err(WalletError::Relay(_))
        ));
    }
}
