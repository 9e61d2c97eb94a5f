use clap::Parser;
use dde_wallet::core::{generate_druid, signable_asset_hash};
use dde_wallet::utils::hex_decode;
use dde_wallet::wallet::{
    construct_address, derive_child_keypair, derive_master_key, generate_seed_phrase,
    regenerate_addresses_from_seed,
};
use dde_wallet::{Command, Opt, WalletConfig};
use log::{error, LevelFilter};
use serde_json::json;
use std::process;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = WalletConfig::load(opt.config.as_deref())?;

    let output = match opt.command {
        Command::NewSeed => json!({ "seed_phrase": generate_seed_phrase()? }),
        Command::Keypair {
            seed,
            depth,
            version,
        } => {
            let master = derive_master_key(&seed, None)?;
            let keypair = derive_child_keypair(&master, depth, version)?;
            json!({
                "depth": depth,
                "address": keypair.address(),
                "public_key": keypair.public_key_hex(),
                "version": keypair.version(),
            })
        }
        Command::Address {
            public_key,
            version,
        } => {
            let bytes = hex_decode(&public_key)?;
            json!({ "address": construct_address(&bytes, version), "version": version })
        }
        Command::Regenerate {
            seed,
            gap,
            addresses,
        } => {
            let gap = gap.unwrap_or(config.gap_threshold);
            let found = regenerate_addresses_from_seed(&seed, None, &addresses, gap)?;
            let found: Vec<_> = found
                .iter()
                .map(|k| json!({ "address": k.address(), "version": k.version() }))
                .collect();
            json!({ "regenerated": found })
        }
        Command::Druid => json!({ "druid": generate_druid() }),
        Command::AssetHash { asset } => json!({ "hash": signable_asset_hash(&asset.0) }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
