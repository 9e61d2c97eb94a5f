// A wallet session: one master key, its known key-pairs and the cipher that
// seals them. Storage is the caller's concern; the session hands out and
// accepts envelopes but never writes anything itself.

use crate::config::WalletConfig;
use crate::core::{
    create_simple_payment, signable_asset_hash, Asset, BalanceSnapshot, CreatedTransaction,
};
use crate::error::{Result, WalletError};
use crate::network::{BalanceProvider, LedgerSubmitter, Relay};
use crate::storage::{
    decrypt_keypair, decrypt_master_key, encrypt_keypair, encrypt_master_key, EncryptedKeypair,
    Envelope, EnvelopeCipher,
};
use crate::wallet::exchange::ExchangeCoordinator;
use crate::wallet::keys::{
    derive_master_key, generate_next_unused_keypair, generate_seed_phrase, regenerate_addresses,
    validate_seed_phrase, AddressVersion, KeyPair, MasterKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Request body asking the ledger to mint an item asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCreation {
    pub item_amount: u64,
    pub script_public_key: String,
    pub public_key: String,
    /// Signature over `signable_asset_hash` of the new item
    pub signature: String,
    pub version: AddressVersion,
    pub drs_tx_hash_spec: Option<String>,
    pub metadata: Option<String>,
}

pub struct Wallet {
    config: WalletConfig,
    master_key: MasterKey,
    cipher: EnvelopeCipher,
    keypairs: HashMap<String, KeyPair>,
}

impl Wallet {
    /// Restore from a seed phrase; `passphrase` keys the envelopes
    pub fn from_seed(config: WalletConfig, seed_phrase: &str, passphrase: &str) -> Result<Wallet> {
        if !validate_seed_phrase(seed_phrase) {
            return Err(WalletError::InvalidSeedPhrase(
                "not a valid BIP-39 English mnemonic".to_string(),
            ));
        }
        let master_key = derive_master_key(seed_phrase, None)?;
        Ok(Self::with_master_key(config, master_key, passphrase))
    }

    /// Fresh wallet on a newly generated seed phrase
    pub fn generate(config: WalletConfig, passphrase: &str) -> Result<Wallet> {
        let seed_phrase = generate_seed_phrase()?;
        log::info!("Generated a new seed phrase");
        Self::from_seed(config, &seed_phrase, passphrase)
    }

    /// Reopen from a stored master-key envelope
    pub fn open(config: WalletConfig, passphrase: &str, master_key: &Envelope) -> Result<Wallet> {
        let cipher = EnvelopeCipher::from_passphrase(passphrase);
        let master_key = decrypt_master_key(&cipher, master_key)?;
        Ok(Wallet {
            config,
            master_key,
            cipher,
            keypairs: HashMap::new(),
        })
    }

    fn with_master_key(config: WalletConfig, master_key: MasterKey, passphrase: &str) -> Wallet {
        Wallet {
            config,
            master_key,
            cipher: EnvelopeCipher::from_passphrase(passphrase),
            keypairs: HashMap::new(),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn seed_phrase(&self) -> &str {
        self.master_key.seed_phrase()
    }

    pub fn cipher(&self) -> &EnvelopeCipher {
        &self.cipher
    }

    /// Known addresses, sorted
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.keypairs.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn keypairs(&self) -> &HashMap<String, KeyPair> {
        &self.keypairs
    }

    pub fn keypair(&self, address: &str) -> Result<&KeyPair> {
        self.keypairs
            .get(address)
            .ok_or_else(|| WalletError::KeypairNotFound(address.to_string()))
    }

    pub fn encrypted_master_key(&self) -> Result<Envelope> {
        encrypt_master_key(&self.cipher, &self.master_key)
    }

    /// Derive and remember the next key-pair not already known
    pub fn new_keypair(&mut self, version: AddressVersion) -> Result<KeyPair> {
        let known = self.addresses();
        let keypair = generate_next_unused_keypair(
            &self.master_key,
            version,
            &known,
            self.config.max_derivation_attempts,
        )?;
        self.keypairs
            .insert(keypair.address().to_string(), keypair.clone());
        Ok(keypair)
    }

    pub fn encrypt_keypair(&self, address: &str) -> Result<EncryptedKeypair> {
        encrypt_keypair(&self.cipher, self.keypair(address)?)
    }

    /// Decrypt a stored key-pair and add it to the session
    pub fn import_keypair(&mut self, encrypted: &EncryptedKeypair) -> Result<String> {
        let keypair = decrypt_keypair(&self.cipher, encrypted)?;
        let address = keypair.address().to_string();
        self.keypairs.insert(address.clone(), keypair);
        Ok(address)
    }

    /// Recover key-pairs for `candidates` from the seed; returns what was found
    pub fn regenerate(&mut self, candidates: &[String]) -> Result<Vec<String>> {
        let found = regenerate_addresses(&self.master_key, candidates, self.config.gap_threshold)?;
        let mut addresses = Vec::with_capacity(found.len());
        for keypair in found {
            addresses.push(keypair.address().to_string());
            self.keypairs.insert(keypair.address().to_string(), keypair);
        }
        Ok(addresses)
    }

    pub async fn fetch_balance(&self, balances: &dyn BalanceProvider) -> Result<BalanceSnapshot> {
        balances.fetch_balance(&self.addresses()).await
    }

    pub async fn make_token_payment(
        &mut self,
        balances: &dyn BalanceProvider,
        ledger: &dyn LedgerSubmitter,
        payment_address: &str,
        amount: u64,
        excess_address: Option<&str>,
    ) -> Result<CreatedTransaction> {
        self.make_payment(
            balances,
            ledger,
            payment_address,
            Asset::token(amount),
            excess_address,
        )
        .await
    }

    pub async fn make_item_payment(
        &mut self,
        balances: &dyn BalanceProvider,
        ledger: &dyn LedgerSubmitter,
        payment_address: &str,
        amount: u64,
        drs_tx_hash: &str,
        metadata: Option<String>,
        excess_address: Option<&str>,
    ) -> Result<CreatedTransaction> {
        self.make_payment(
            balances,
            ledger,
            payment_address,
            Asset::item(amount, drs_tx_hash, metadata),
            excess_address,
        )
        .await
    }

    /// Fetch, build and submit to the configured ledger host.
    ///
    /// Without an explicit excess address a fresh latest-version key-pair
    /// takes the change. It joins the session only once the payment is
    /// accepted and actually produced change.
    async fn make_payment(
        &mut self,
        balances: &dyn BalanceProvider,
        ledger: &dyn LedgerSubmitter,
        payment_address: &str,
        asset: Asset,
        excess_address: Option<&str>,
    ) -> Result<CreatedTransaction> {
        let balance = self.fetch_balance(balances).await?;
        let (excess_address, fresh_excess) = match excess_address {
            Some(address) => (address.to_string(), None),
            None => {
                let candidate = generate_next_unused_keypair(
                    &self.master_key,
                    AddressVersion::Latest,
                    &self.addresses(),
                    self.config.max_derivation_attempts,
                )?;
                (candidate.address().to_string(), Some(candidate))
            }
        };

        let created =
            create_simple_payment(payment_address, &asset, &excess_address, &balance, &self.keypairs)?;
        ledger
            .submit_transactions(&self.config.ledger_host, vec![created.transaction.clone()])
            .await?
            .into_result()?;

        if let Some(keypair) = fresh_excess.filter(|_| created.excess_used) {
            self.keypairs.insert(keypair.address().to_string(), keypair);
        }

        log::info!(
            "Paid {asset} to {payment_address} from {} inputs",
            created.transaction.inputs.len()
        );
        Ok(created)
    }

    /// Signed request for minting `item_amount` items to `address`
    pub fn item_creation(
        &self,
        address: &str,
        item_amount: u64,
        drs_tx_hash_spec: Option<String>,
        metadata: Option<String>,
    ) -> Result<ItemCreation> {
        let keypair = self.keypair(address)?;
        let asset = Asset::item(item_amount, drs_tx_hash_spec.clone().unwrap_or_default(), None);
        let signable = signable_asset_hash(&asset);

        Ok(ItemCreation {
            item_amount,
            script_public_key: keypair.address().to_string(),
            public_key: keypair.public_key_hex(),
            signature: keypair.sign_message(signable.as_bytes()),
            version: keypair.version(),
            drs_tx_hash_spec,
            metadata,
        })
    }

    pub fn sign_message(&self, address: &str, message: &[u8]) -> Result<String> {
        Ok(self.keypair(address)?.sign_message(message))
    }

    /// Swap coordinator sealing halves with this session's cipher
    pub fn exchange<'a>(
        &'a self,
        relay: &'a dyn Relay,
        balances: &'a dyn BalanceProvider,
        ledger: &'a dyn LedgerSubmitter,
    ) -> ExchangeCoordinator<'a> {
        ExchangeCoordinator::new(relay, balances, ledger, &self.cipher)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("config", &self.config)
            .field("addresses", &self.addresses())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::MemoryLedger;
    use crate::wallet::verify_message;

    const SEED: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_invalid_seed_is_rejected() {
        assert!(matches!(
            Wallet::from_seed(WalletConfig::default(), "one two three", "pw"),
            Err(WalletError::InvalidSeedPhrase(_))
        ));
    }

    #[test]
    fn test_generated_wallet_reopens() {
        let wallet = Wallet::generate(WalletConfig::default(), "pw").unwrap();
        assert_eq!(wallet.seed_phrase().split_whitespace().count(), 12);

        let envelope = wallet.encrypted_master_key().unwrap();
        let reopened = Wallet::open(WalletConfig::default(), "pw", &envelope).unwrap();
        assert_eq!(reopened.seed_phrase(), wallet.seed_phrase());
        assert_eq!(
            Wallet::open(WalletConfig::default(), "other", &envelope).unwrap_err(),
            WalletError::DecryptionFailed
        );
    }

    #[test]
    fn test_keypairs_are_unique_and_portable() {
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let first = wallet.new_keypair(AddressVersion::Latest).unwrap();
        let second = wallet.new_keypair(AddressVersion::Latest).unwrap();
        assert_ne!(first.address(), second.address());
        assert_eq!(wallet.addresses().len(), 2);

        let stored = wallet.encrypt_keypair(second.address()).unwrap();
        let mut other = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        assert_eq!(other.import_keypair(&stored).unwrap(), second.address());

        assert!(matches!(
            wallet.encrypt_keypair("unknown"),
            Err(WalletError::KeypairNotFound(_))
        ));
    }

    #[test]
    fn test_regenerate_restores_known_addresses() {
        let mut original = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        original.new_keypair(AddressVersion::Latest).unwrap();
        original.new_keypair(AddressVersion::Temporary).unwrap();
        original.new_keypair(AddressVersion::Latest).unwrap();
        let addresses = original.addresses();

        let mut restored = Wallet::from_seed(WalletConfig::default(), SEED, "other").unwrap();
        let mut found = restored.regenerate(&addresses).unwrap();
        found.sort();
        assert_eq!(found, addresses);
        assert_eq!(restored.addresses(), addresses);
    }

    #[test]
    fn test_item_creation_signs_asset_hash() {
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let keypair = wallet.new_keypair(AddressVersion::Latest).unwrap();
        let request = wallet
            .item_creation(keypair.address(), 10, None, Some("{\"name\":\"x\"}".to_string()))
            .unwrap();

        assert_eq!(request.script_public_key, keypair.address());
        let hash = signable_asset_hash(&Asset::item(10, "", None));
        assert!(verify_message(&request.public_key, &request.signature, hash.as_bytes()));

        let json = serde_json::to_value(&request).unwrap();
        assert!(json["version"].is_null());
        assert_eq!(json["item_amount"], 10);
    }

    #[test]
    fn test_token_payment_uses_fresh_change_address() {
        let ledger = MemoryLedger::new();
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let funded = wallet.new_keypair(AddressVersion::Latest).unwrap();
        ledger.fund(funded.address(), Asset::token(100)).unwrap();

        let created = block_on(wallet.make_token_payment(&ledger, &ledger, "payee", 40, None)).unwrap();
        assert!(created.excess_used);
        let change = created.transaction.outputs[1].address().unwrap().to_string();
        assert!(wallet.keypairs().contains_key(&change));
        assert_ne!(change, funded.address());

        assert_eq!(ledger.balance_of("payee", &Asset::token(0)).unwrap(), 40);
        assert_eq!(ledger.balance_of(&change, &Asset::token(0)).unwrap(), 60);
        assert_eq!(
            ledger.submissions().unwrap()[0].host,
            WalletConfig::default().ledger_host
        );
    }

    #[test]
    fn test_exact_payment_keeps_no_change_address() {
        let ledger = MemoryLedger::new();
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let funded = wallet.new_keypair(AddressVersion::Latest).unwrap();
        ledger.fund(funded.address(), Asset::token(40)).unwrap();

        let created =
            block_on(wallet.make_token_payment(&ledger, &ledger, "payee", 40, None)).unwrap();
        assert!(!created.excess_used);
        assert_eq!(created.transaction.outputs.len(), 1);
        assert_eq!(wallet.addresses(), vec![funded.address().to_string()]);
    }

    #[test]
    fn test_failed_payment_keeps_no_change_address() {
        let ledger = MemoryLedger::new();
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let funded = wallet.new_keypair(AddressVersion::Latest).unwrap();
        ledger.fund(funded.address(), Asset::token(10)).unwrap();

        assert!(matches!(
            block_on(wallet.make_token_payment(&ledger, &ledger, "payee", 50, None)),
            Err(WalletError::InsufficientFunds { .. })
        ));
        assert_eq!(wallet.addresses().len(), 1);

        ledger.reject_with(Some("busy")).unwrap();
        assert_eq!(
            block_on(wallet.make_token_payment(&ledger, &ledger, "payee", 4, None)),
            Err(WalletError::Ledger("busy".to_string()))
        );
        assert_eq!(wallet.addresses(), vec![funded.address().to_string()]);
    }

    #[test]
    fn test_ledger_rejection_is_an_error() {
        let ledger = MemoryLedger::new();
        let mut wallet = Wallet::from_seed(WalletConfig::default(), SEED, "pw").unwrap();
        let funded = wallet.new_keypair(AddressVersion::Latest).unwrap();
        ledger.fund(funded.address(), Asset::token(5)).unwrap();
        ledger.reject_with(Some("duplicate")).unwrap();

        assert_eq!(
            block_on(wallet.make_token_payment(&ledger, &ledger, "payee", 5, Some(funded.address()))),
            Err(WalletError::Ledger("duplicate".to_string()))
        );
    }
}
