//! cswap: drive the confidential pool devnet from the command line
//!
//! every command opens the devnet snapshot, acts as a named dev account
//! and writes the snapshot back after mutations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cswap_client::{dev_identity, spawn_poller, ClientConfig, Devnet, Orchestrator, PoolView, Side, SnapshotSource};
use cswap_disclosure::StructuredSigner;
use cswap_pool::{format_units, parse_units, SHARE_DECIMALS};
use tracing::info;

#[derive(Parser)]
#[command(name = "cswap")]
#[command(about = "confidential constant-product pool (devnet)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// config file (default: ~/.config/cswap/config.toml)
    #[arg(long, env = "CSWAP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// devnet snapshot directory, overrides the config
    #[arg(long, env = "CSWAP_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// dev account to act as
    #[arg(long, short, default_value = "alice", global = true)]
    account: String,

    /// print results as json
    #[arg(long, global = true)]
    json: bool,

    /// tracing filter, e.g. `debug` or `cswap_pool=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// write a default config file
    Init {
        /// overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// poll pool state until interrupted
    Watch,

    #[command(flatten)]
    Devnet(DevnetCommand),
}

/// commands acting on the devnet as `--account`
#[derive(Subcommand)]
enum DevnetCommand {
    /// show account, asset and pool addresses
    Addresses,

    /// devnet faucet: credit the account with an asset
    Mint {
        /// asset symbol, e.g. USDC
        asset: String,
        /// decimal amount, e.g. 1000.5
        amount: String,
    },

    /// authorize the pool to move both assets for the configured lifetime
    EnablePool,

    /// revoke the pool's operator rights
    DisablePool,

    /// deposit both assets for pool shares
    AddLiquidity {
        amount_a: String,
        amount_b: String,
    },

    /// burn pool shares for both assets
    RemoveLiquidity {
        /// decimal share amount, or "all"
        shares: String,
    },

    /// quote a swap without executing it
    Quote {
        /// asset being sold
        sell: String,
        amount: String,
    },

    /// sell an exact amount of one asset for the other
    Swap {
        /// asset being sold
        sell: String,
        amount: String,

        /// minimum acceptable output, overrides --slippage
        #[arg(long)]
        min_out: Option<String>,

        /// tolerated slippage from the current quote, basis points
        #[arg(long, default_value_t = 50)]
        slippage: u32,
    },

    /// decrypt the account's balances and show its shares
    Balance,

    /// public pool state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level {:?}", level))?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "cswap=info".into()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => ClientConfig::default_path()?,
    };

    let command = match cli.command {
        Commands::Init { force } => return init(&config_path, force),
        Commands::Watch => {
            let (config, snapshot_path) = load_config(&config_path, cli.data_dir.as_deref())?;
            return watch(config, snapshot_path).await;
        }
        Commands::Devnet(command) => command,
    };

    let (config, snapshot_path) = load_config(&config_path, cli.data_dir.as_deref())?;
    let devnet = Devnet::open(&config, &snapshot_path)?;
    let orch = Orchestrator::new(config, devnet);
    let signer = dev_identity(&cli.account)?;
    let account = signer.address();

    match command {
        DevnetCommand::Addresses => {
            let pair = orch.pair();
            let config = orch.config();
            if cli.json {
                let mut out = serde_json::Map::new();
                out.insert("account".into(), serde_json::to_value(account)?);
                out.insert(config.asset_a.symbol.clone(), serde_json::to_value(pair.asset_a)?);
                out.insert(config.asset_b.symbol.clone(), serde_json::to_value(pair.asset_b)?);
                out.insert("pool".into(), serde_json::to_value(orch.pool_account())?);
                println!("{}", serde_json::Value::Object(out));
            } else {
                println!("account ({}): {}", cli.account, account);
                println!("{}: {}", config.asset_a.symbol, pair.asset_a);
                println!("{}: {}", config.asset_b.symbol, pair.asset_b);
                println!("pool: {}", orch.pool_account());
            }
        }

        DevnetCommand::Mint { asset, amount } => {
            let (side, decimals) = side_of(orch.config(), &asset)?;
            let amount = parse_asset(&amount, decimals)?;
            let handle = orch.mint(&account, side, amount)?;
            orch.persist()?;
            info!("minted {} {} to {}", format_units(amount as u128, decimals), asset, cli.account);
            println!("new balance handle: {}", handle);
        }

        DevnetCommand::EnablePool => {
            let grants = orch.enable_pool(&account)?;
            orch.persist()?;
            for grant in grants {
                println!("pool may move {} until {}", grant.asset, grant.expiry);
            }
        }

        DevnetCommand::DisablePool => {
            orch.revoke_pool(&account)?;
            orch.persist()?;
            println!("pool operator rights revoked");
        }

        DevnetCommand::AddLiquidity { amount_a, amount_b } => {
            let amount_a = parse_asset(&amount_a, orch.config().asset_a.decimals)?;
            let amount_b = parse_asset(&amount_b, orch.config().asset_b.decimals)?;

            let quote = orch.quote_liquidity(amount_a, amount_b)?;
            let (excess_a, excess_b) = quote.excess(amount_a, amount_b);
            if excess_a > 0 || excess_b > 0 {
                println!(
                    "note: deposit is off the pool ratio, {} {} and {} {} go to the reserves without shares",
                    fmt_side(&orch, Side::A, excess_a),
                    orch.config().asset_a.symbol,
                    fmt_side(&orch, Side::B, excess_b),
                    orch.config().asset_b.symbol,
                );
            }

            let receipt = orch.add_liquidity(&account, amount_a, amount_b)?;
            orch.persist()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!("minted {} shares", format_units(receipt.shares_minted, SHARE_DECIMALS));
            }
        }

        DevnetCommand::RemoveLiquidity { shares } => {
            let shares = if shares.eq_ignore_ascii_case("all") {
                orch.devnet().engine().liquidity_of(&account)
            } else {
                parse_units(&shares, SHARE_DECIMALS)?
            };
            let receipt = orch.remove_liquidity(&account, shares)?;
            orch.persist()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!(
                    "received {} {} and {} {}",
                    fmt_side(&orch, Side::A, receipt.amount_a),
                    orch.config().asset_a.symbol,
                    fmt_side(&orch, Side::B, receipt.amount_b),
                    orch.config().asset_b.symbol,
                );
            }
        }

        DevnetCommand::Quote { sell, amount } => {
            let (side, decimals) = side_of(orch.config(), &sell)?;
            let amount = parse_asset(&amount, decimals)?;
            let quote = orch.quote_swap(side, amount)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&quote)?);
            } else {
                println!(
                    "{} {} -> {} {} (impact {}.{:02}%)",
                    format_units(amount as u128, decimals),
                    orch.config().asset_config(side).symbol,
                    fmt_side(&orch, side.other(), quote.amount_out),
                    orch.config().asset_config(side.other()).symbol,
                    quote.price_impact_bps / 100,
                    quote.price_impact_bps % 100,
                );
            }
        }

        DevnetCommand::Swap {
            sell,
            amount,
            min_out,
            slippage,
        } => {
            let (side, decimals) = side_of(orch.config(), &sell)?;
            let amount = parse_asset(&amount, decimals)?;
            let min_out = min_out
                .map(|m| parse_asset(&m, orch.config().asset_config(side.other()).decimals))
                .transpose()?;

            let receipt = orch.swap(&account, side, amount, min_out, slippage)?;
            orch.persist()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&receipt)?);
            } else {
                println!(
                    "sold {} {} for {} {}",
                    format_units(receipt.amount_in as u128, decimals),
                    orch.config().asset_config(side).symbol,
                    fmt_side(&orch, side.other(), receipt.amount_out),
                    orch.config().asset_config(side.other()).symbol,
                );
            }
        }

        DevnetCommand::Balance => {
            let view = orch.decrypt_balances(signer.clone()).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("{} {}", fmt_side(&orch, Side::A, view.balance_a), orch.config().asset_a.symbol);
                println!("{} {}", fmt_side(&orch, Side::B, view.balance_b), orch.config().asset_b.symbol);
                println!("{} shares", format_units(view.shares, SHARE_DECIMALS));
                if !orch.pool_enabled(&account)? {
                    println!("pool not authorized, run `cswap enable-pool` before trading");
                }
            }
        }

        DevnetCommand::Status => {
            let view = orch.pool_view();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(orch.config(), &view);
            }
        }
    }

    Ok(())
}

/// config from `path` (defaults if absent) and the devnet snapshot location
fn load_config(path: &Path, data_dir: Option<&Path>) -> Result<(ClientConfig, PathBuf)> {
    let mut config = ClientConfig::load_or_default(Some(path))?;
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir.to_path_buf());
    }
    let snapshot_path = Devnet::default_path(&config)?;
    Ok((config, snapshot_path))
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, pass --force to overwrite", path.display());
    }
    ClientConfig::default().save(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn watch(config: ClientConfig, snapshot_path: PathBuf) -> Result<()> {
    let interval = config.refresh_interval();
    info!("watching {} every {:?}", snapshot_path.display(), interval);

    let display = config.clone();
    let mut poller = spawn_poller(SnapshotSource::new(config, snapshot_path), interval);

    loop {
        tokio::select! {
            changed = poller.updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = poller.updates.borrow_and_update().clone();
                if let Some(view) = view {
                    print_view(&display, &view);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    drop(poller.updates);
    poller.handle.await.context("refresh poller panicked")?;
    Ok(())
}

fn print_view(config: &ClientConfig, view: &PoolView) {
    let (ra, rb) = view.reserves;
    println!(
        "reserves: {} {} / {} {}",
        format_units(ra as u128, config.asset_a.decimals),
        config.asset_a.symbol,
        format_units(rb as u128, config.asset_b.decimals),
        config.asset_b.symbol,
    );
    println!("liquidity: {} shares across {} providers", format_units(view.total_liquidity, SHARE_DECIMALS), view.providers);
}

fn side_of(config: &ClientConfig, symbol: &str) -> Result<(Side, u32)> {
    let (side, asset) = config
        .asset(symbol)
        .with_context(|| format!("unknown asset {}, expected {} or {}", symbol, config.asset_a.symbol, config.asset_b.symbol))?;
    Ok((side, asset.decimals))
}

fn parse_asset(s: &str, decimals: u32) -> Result<u64> {
    let raw = parse_units(s, decimals)?;
    u64::try_from(raw).with_context(|| format!("amount {} exceeds the 64-bit balance range", s))
}

fn fmt_side(orch: &Orchestrator, side: Side, amount: u64) -> String {
    format_units(amount as u128, orch.config().asset_config(side).decimals)
}
