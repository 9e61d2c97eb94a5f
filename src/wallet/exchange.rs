// Two-party atomic swaps coordinated through the relay.
//
// Initiator A builds and seals its half locally, then leaves a pending record
// for B under B's payment address. B either accepts (building and submitting
// its own half to the host A named) or rejects, and in both cases replies
// under A's receive address. A's finalize pass submits the halves B accepted
// with B's input digest filled in, and clears every resolved record.
//
// Each half carries the expectation of what its *sender* receives in return,
// so the ledger only settles the DRUID once both halves are present.

use crate::core::{
    assemble_transaction, construct_tx_ins_address, generate_druid, select_inputs,
    validate_druid, Asset, DdeValues, DruidExpectation, Transaction,
};
use crate::error::{Result, WalletError};
use crate::network::{
    BalanceProvider, ExchangeStatus, LedgerSubmitter, PendingExchange, Relay, RelayAuth,
    RelayKey, RelayRecord,
};
use crate::storage::{decrypt_transaction, encrypt_transaction, Envelope, EnvelopeCipher};
use crate::wallet::KeyPair;
use std::collections::{BTreeMap, HashMap};

/// Everything the initiator decides up front
#[derive(Debug, Clone)]
pub struct SwapProposal {
    /// What A pays B
    pub sending: Asset,
    /// What A wants from B
    pub receiving: Asset,
    /// B's address that receives `sending`
    pub counterparty_address: String,
    /// Ledger host both halves are submitted to
    pub compute_host: String,
    pub excess_address: String,
}

/// A's half, sealed, plus the id it is filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiatedSwap {
    pub druid: String,
    pub encrypted_transaction: Envelope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RespondOutcome {
    pub druid: String,
    pub status: ExchangeStatus,
    /// B's half when it was accepted and submitted
    pub transaction: Option<Transaction>,
}

/// Result of one finalize pass; DRUIDs in relay order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub submitted: Vec<String>,
    pub rejected: Vec<String>,
    /// Accepted records with no local half on this device; left untouched
    pub unmatched: Vec<String>,
}

impl FinalizeOutcome {
    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty() && self.rejected.is_empty() && self.unmatched.is_empty()
    }
}

/// Drives the swap protocol against a relay and a ledger
pub struct ExchangeCoordinator<'a> {
    relay: &'a dyn Relay,
    balances: &'a dyn BalanceProvider,
    ledger: &'a dyn LedgerSubmitter,
    cipher: &'a EnvelopeCipher,
}

impl<'a> ExchangeCoordinator<'a> {
    pub fn new(
        relay: &'a dyn Relay,
        balances: &'a dyn BalanceProvider,
        ledger: &'a dyn LedgerSubmitter,
        cipher: &'a EnvelopeCipher,
    ) -> Self {
        Self {
            relay,
            balances,
            ledger,
            cipher,
        }
    }

    /// Build A's half paying B and publish the pending record for B.
    ///
    /// `receive_keypair` is where A will be paid; it also signs the relay
    /// write so B knows where to reply.
    pub async fn initiate(
        &self,
        proposal: &SwapProposal,
        receive_keypair: &KeyPair,
        keypairs: &HashMap<String, KeyPair>,
    ) -> Result<InitiatedSwap> {
        let druid = generate_druid();
        let balance = self.balances.fetch_balance(&sorted_addresses(keypairs)).await?;

        let selection = select_inputs(&proposal.sending, &balance, keypairs)?;
        let initiator_digest = construct_tx_ins_address(&selection.inputs)?;

        let sender_expectation = DruidExpectation {
            from: String::new(),
            to: receive_keypair.address().to_string(),
            asset: proposal.receiving.clone(),
        };
        let receiver_expectation = DruidExpectation {
            from: initiator_digest,
            to: proposal.counterparty_address.clone(),
            asset: proposal.sending.clone(),
        };

        let created = assemble_transaction(
            &proposal.counterparty_address,
            &proposal.sending,
            &proposal.excess_address,
            Some(DdeValues::new(druid.clone(), sender_expectation.clone())),
            selection,
        )?;
        let encrypted_transaction = encrypt_transaction(self.cipher, &created.transaction)?;

        let record = RelayRecord {
            key: RelayKey::new(proposal.counterparty_address.clone(), druid.clone()),
            exchange: PendingExchange {
                druid: druid.clone(),
                sender_expectation,
                receiver_expectation,
                status: ExchangeStatus::Pending,
                compute_host: proposal.compute_host.clone(),
            },
        };
        self.relay
            .set_records(&RelayAuth::sign(receive_keypair), vec![record])
            .await?;

        log::info!(
            "Initiated swap {druid}: paying {} to {}",
            proposal.sending,
            proposal.counterparty_address
        );
        Ok(InitiatedSwap {
            druid,
            encrypted_transaction,
        })
    }

    /// B's answer to a pending swap addressed to `payment_keypair`.
    ///
    /// On accept, B's half pays A's receive address from `keypairs` and is
    /// submitted to the host named in the record. The reply is written under
    /// A's receive address and B's inbound record is removed either way.
    pub async fn respond(
        &self,
        druid: &str,
        accept: bool,
        payment_keypair: &KeyPair,
        keypairs: &HashMap<String, KeyPair>,
        excess_address: &str,
    ) -> Result<RespondOutcome> {
        validate_druid(druid)?;
        let auth = RelayAuth::sign(payment_keypair);

        let mut matches: Vec<RelayRecord> = self
            .relay
            .get_records(&auth)
            .await?
            .into_iter()
            .filter(|r| r.exchange.druid == druid && r.exchange.status == ExchangeStatus::Pending)
            .collect();
        if matches.len() != 1 {
            return Err(WalletError::DruidRecordNotSingular {
                druid: druid.to_string(),
                found: matches.len(),
            });
        }
        let inbound = matches.remove(0);
        if inbound.key.field != druid
            || inbound.exchange.receiver_expectation.to != payment_keypair.address()
        {
            log::warn!("Swap record {druid} is not addressed to {}", payment_keypair.address());
            return Err(WalletError::InvalidDruid(druid.to_string()));
        }
        let mut exchange = inbound.exchange.clone();

        let transaction = if accept {
            let balance = self.balances.fetch_balance(&sorted_addresses(keypairs)).await?;
            let payment = exchange.sender_expectation.asset.clone();

            let selection = select_inputs(&payment, &balance, keypairs)?;
            exchange.sender_expectation.from = construct_tx_ins_address(&selection.inputs)?;
            let created = assemble_transaction(
                &exchange.sender_expectation.to,
                &payment,
                excess_address,
                Some(DdeValues::new(druid, exchange.receiver_expectation.clone())),
                selection,
            )?;

            self.ledger
                .submit_transactions(&exchange.compute_host, vec![created.transaction.clone()])
                .await?
                .into_result()?;
            exchange.status = ExchangeStatus::Accepted;
            Some(created.transaction)
        } else {
            exchange.status = ExchangeStatus::Rejected;
            None
        };

        let reply = RelayRecord {
            key: RelayKey::new(exchange.sender_expectation.to.clone(), druid),
            exchange: exchange.clone(),
        };
        self.relay.set_records(&auth, vec![reply]).await?;
        self.relay.delete_records(&auth, vec![inbound.key]).await?;

        log::info!("Responded to swap {druid}: {}", exchange.status);
        Ok(RespondOutcome {
            druid: druid.to_string(),
            status: exchange.status,
            transaction,
        })
    }

    /// A's polling pass over replies under `receive_keypair`.
    ///
    /// Accepted halves are decrypted from `local_halves` (keyed by DRUID),
    /// bound to B's expectation and submitted per host; resolved records are
    /// then deleted in one batch. Any failure aborts before deletion, so a
    /// re-run picks up the same records, and a pass over nothing does nothing.
    pub async fn finalize(
        &self,
        receive_keypair: &KeyPair,
        local_halves: &HashMap<String, Envelope>,
    ) -> Result<FinalizeOutcome> {
        let auth = RelayAuth::sign(receive_keypair);
        let records = self.relay.get_records(&auth).await?;

        let mut outcome = FinalizeOutcome::default();
        let mut by_host: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
        let mut resolved = Vec::new();

        for record in records {
            let druid = record.exchange.druid.clone();
            match record.exchange.status {
                ExchangeStatus::Pending => continue,
                ExchangeStatus::Rejected => {
                    outcome.rejected.push(druid);
                    resolved.push(record.key);
                }
                ExchangeStatus::Accepted => {
                    let Some(envelope) = local_halves.get(&druid) else {
                        log::warn!("No local half for accepted swap {druid}");
                        outcome.unmatched.push(druid);
                        continue;
                    };
                    let mut transaction = decrypt_transaction(self.cipher, envelope)?;
                    let Some(info) = transaction.druid_info.as_mut() else {
                        return Err(WalletError::InvalidDruid(druid));
                    };
                    if info.druid != druid {
                        return Err(WalletError::InvalidDruid(druid));
                    }
                    info.expectations = vec![record.exchange.sender_expectation.clone()];

                    by_host
                        .entry(record.exchange.compute_host.clone())
                        .or_default()
                        .push(transaction);
                    outcome.submitted.push(druid);
                    resolved.push(record.key);
                }
            }
        }

        for (host, transactions) in by_host {
            log::debug!("Submitting {} swap halves to {host}", transactions.len());
            self.ledger
                .submit_transactions(&host, transactions)
                .await?
                .into_result()?;
        }
        if !resolved.is_empty() {
            self.relay.delete_records(&auth, resolved).await?;
        }

        if !outcome.is_empty() {
            log::info!(
                "Finalized swaps: {} submitted, {} rejected",
                outcome.submitted.len(),
                outcome.rejected.len()
            );
        }
        Ok(outcome)
    }
}

/// Balance requests go out in a stable order so selection is reproducible
fn sorted_addresses(keypairs: &HashMap<String, KeyPair>) -> Vec<String> {
    let mut addresses: Vec<String> = keypairs.keys().cloned().collect();
    addresses.sort();
    addresses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{keypair_map, MemoryLedger, MemoryRelay};
    use crate::wallet::AddressVersion;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    struct Party {
        pay: KeyPair,
        receive: KeyPair,
        keypairs: HashMap<String, KeyPair>,
    }

    fn party(seed: u8) -> Party {
        let pay = KeyPair::from_secret_key([seed; 32], AddressVersion::Latest);
        let receive = KeyPair::from_secret_key([seed + 100; 32], AddressVersion::Latest);
        Party {
            keypairs: keypair_map([pay.clone()]),
            pay,
            receive,
        }
    }

    #[test]
    fn test_reject_clears_without_submitting() {
        let ledger = MemoryLedger::new();
        let relay = MemoryRelay::new();
        let cipher = EnvelopeCipher::from_passphrase("a");
        let coordinator = ExchangeCoordinator::new(&relay, &ledger, &ledger, &cipher);
        let (a, b) = (party(1), party(2));
        ledger.fund(a.pay.address(), Asset::token(50)).unwrap();

        let proposal = SwapProposal {
            sending: Asset::token(20),
            receiving: Asset::item(1, "drs", None),
            counterparty_address: b.pay.address().to_string(),
            compute_host: "compute".to_string(),
            excess_address: a.pay.address().to_string(),
        };
        let swap = block_on(coordinator.initiate(&proposal, &a.receive, &a.keypairs)).unwrap();

        let outcome = block_on(coordinator.respond(
            &swap.druid,
            false,
            &b.pay,
            &b.keypairs,
            b.pay.address(),
        ))
        .unwrap();
        assert_eq!(outcome.status, ExchangeStatus::Rejected);
        assert!(outcome.transaction.is_none());

        let halves: HashMap<String, Envelope> =
            [(swap.druid.clone(), swap.encrypted_transaction)].into_iter().collect();
        let finalized = block_on(coordinator.finalize(&a.receive, &halves)).unwrap();
        assert_eq!(finalized.rejected, vec![swap.druid]);
        assert!(finalized.submitted.is_empty());
        assert!(ledger.submissions().unwrap().is_empty());
        assert!(relay.is_empty().unwrap());
    }

    #[test]
    fn test_respond_requires_exactly_one_pending_record() {
        let ledger = MemoryLedger::new();
        let relay = MemoryRelay::new();
        let cipher = EnvelopeCipher::from_passphrase("b");
        let coordinator = ExchangeCoordinator::new(&relay, &ledger, &ledger, &cipher);
        let b = party(2);

        assert_eq!(
            block_on(coordinator.respond("DRUID0x123456789", true, &b.pay, &b.keypairs, "x")),
            Err(WalletError::DruidRecordNotSingular {
                druid: "DRUID0x123456789".to_string(),
                found: 0
            })
        );
        assert!(matches!(
            block_on(coordinator.respond("not-a-druid", true, &b.pay, &b.keypairs, "x")),
            Err(WalletError::InvalidDruid(_))
        ));
    }

    fn swap_for(a: &Party, b: &Party) -> SwapProposal {
        SwapProposal {
            sending: Asset::token(15),
            receiving: Asset::item(1, "drs", None),
            counterparty_address: b.pay.address().to_string(),
            compute_host: "compute".to_string(),
            excess_address: a.pay.address().to_string(),
        }
    }

    #[test]
    fn test_initiate_selects_inputs_in_address_order() {
        let ledger = MemoryLedger::new();
        let relay = MemoryRelay::new();
        let cipher = EnvelopeCipher::from_passphrase("a");
        let coordinator = ExchangeCoordinator::new(&relay, &ledger, &ledger, &cipher);
        let (a, b) = (party(1), party(2));

        let funded: Vec<KeyPair> = (10..14)
            .map(|seed| KeyPair::from_secret_key([seed; 32], AddressVersion::Latest))
            .collect();
        for keypair in &funded {
            ledger.fund(keypair.address(), Asset::token(10)).unwrap();
        }

        let mut digests = Vec::new();
        for _ in 0..4 {
            let keypairs = keypair_map(funded.iter().cloned());
            let swap =
                block_on(coordinator.initiate(&swap_for(&a, &b), &a.receive, &keypairs)).unwrap();
            let half = decrypt_transaction(&cipher, &swap.encrypted_transaction).unwrap();
            digests.push(construct_tx_ins_address(&half.inputs).unwrap());
        }
        assert!(digests.windows(2).all(|pair| pair[0] == pair[1]));

        let records = block_on(relay.get_records(&RelayAuth::sign(&b.pay))).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records
            .iter()
            .all(|r| r.exchange.receiver_expectation.from == digests[0]));
    }

    #[test]
    fn test_respond_refuses_misaddressed_records() {
        let ledger = MemoryLedger::new();
        let relay = MemoryRelay::new();
        let cipher = EnvelopeCipher::from_passphrase("a");
        let coordinator = ExchangeCoordinator::new(&relay, &ledger, &ledger, &cipher);
        let (a, b) = (party(1), party(2));
        ledger.fund(a.pay.address(), Asset::token(50)).unwrap();
        ledger.fund(b.pay.address(), Asset::item(3, "drs", None)).unwrap();
        let b_auth = RelayAuth::sign(&b.pay);

        // Expectation paying someone other than B
        let swap =
            block_on(coordinator.initiate(&swap_for(&a, &b), &a.receive, &a.keypairs)).unwrap();
        let mut record = block_on(relay.get_records(&b_auth)).unwrap().remove(0);
        record.exchange.receiver_expectation.to = "someone_else".to_string();
        block_on(relay.set_records(&b_auth, vec![record])).unwrap();

        assert_eq!(
            block_on(coordinator.respond(&swap.druid, true, &b.pay, &b.keypairs, b.pay.address())),
            Err(WalletError::InvalidDruid(swap.druid.clone()))
        );

        // Record filed under a different DRUID than it names
        let mut record = block_on(relay.get_records(&b_auth)).unwrap().remove(0);
        block_on(relay.delete_records(&b_auth, vec![record.key.clone()])).unwrap();
        record.exchange.receiver_expectation.to = b.pay.address().to_string();
        record.key.field = generate_druid();
        block_on(relay.set_records(&b_auth, vec![record])).unwrap();

        assert_eq!(
            block_on(coordinator.respond(&swap.druid, true, &b.pay, &b.keypairs, b.pay.address())),
            Err(WalletError::InvalidDruid(swap.druid))
        );
        assert!(ledger.submissions().unwrap().is_empty());
        assert_eq!(relay.len().unwrap(), 1);
    }

    #[test]
    fn test_initiate_needs_funds() {
        let ledger = MemoryLedger::new();
        let relay = MemoryRelay::new();
        let cipher = EnvelopeCipher::from_passphrase("a");
        let coordinator = ExchangeCoordinator::new(&relay, &ledger, &ledger, &cipher);
        let (a, b) = (party(1), party(2));

        let proposal = SwapProposal {
            sending: Asset::token(20),
            receiving: Asset::token(1),
            counterparty_address: b.pay.address().to_string(),
            compute_host: "compute".to_string(),
            excess_address: a.pay.address().to_string(),
        };
        assert!(matches!(
            block_on(coordinator.initiate(&proposal, &a.receive, &a.keypairs)),
            Err(WalletError::InsufficientFunds { .. })
        ));
        assert!(relay.is_empty().unwrap());
    }
}
