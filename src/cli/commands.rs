use crate::core::Asset;
use crate::wallet::AddressVersion;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

/// Asset argument in `token:<amount>` or `item:<amount>` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetArg(pub Asset);

impl FromStr for AssetArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, amount) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid asset: {s}. Use token:<amount> or item:<amount>"))?;
        let amount: u64 = amount
            .parse()
            .map_err(|_| format!("Invalid amount in {s}"))?;
        match kind.to_lowercase().as_str() {
            "token" => Ok(AssetArg(Asset::token(amount))),
            "item" => Ok(AssetArg(Asset::item(amount, String::new(), None))),
            _ => Err(format!("Invalid asset kind: {kind}. Valid options: token, item")),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "dde-wallet", about = "Offline wallet key and transaction tooling")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "new-seed", about = "Generate a 12-word seed phrase")]
    NewSeed,
    #[command(name = "keypair", about = "Derive the key-pair at a depth")]
    Keypair {
        #[arg(long = "seed", help = "BIP-39 seed phrase")]
        seed: String,
        #[arg(long = "depth", default_value_t = 0)]
        depth: u32,
        #[arg(
            long = "address-version",
            default_value = "latest",
            help = "Address scheme (latest, temporary, old)"
        )]
        version: AddressVersion,
    },
    #[command(name = "address", about = "Address of a hex public key")]
    Address {
        #[arg(help = "Hex-encoded Ed25519 public key")]
        public_key: String,
        #[arg(long = "address-version", default_value = "latest")]
        version: AddressVersion,
    },
    #[command(name = "regenerate", about = "Recover key-pairs for known addresses")]
    Regenerate {
        #[arg(long = "seed")]
        seed: String,
        #[arg(long = "gap", help = "Override the configured gap threshold")]
        gap: Option<u32>,
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    #[command(name = "druid", about = "Generate a swap identifier")]
    Druid,
    #[command(name = "asset-hash", about = "Hash signed when creating an asset")]
    AssetHash {
        #[arg(help = "token:<amount> or item:<amount>")]
        asset: AssetArg,
    },
}
