//! custody-engine operator CLI.
//!
//! Drives the engine's operations from the command line. Keys are read from
//! `CUSTODY_KEY_<address>` environment variables.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;

use custody_engine::config::load_config;
use custody_engine::engine::types::*;
use custody_engine::keys::EnvKeyProvider;
use custody_engine::observability::{logging, metrics};
use custody_engine::{EngineConfig, TransactionEngine};

#[derive(Parser)]
#[command(name = "custody-engine")]
#[command(about = "Custodial multi-chain transaction engine", long_about = None)]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON instead of key/value lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send native coin or a token
    Send {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Smallest-unit amount
        #[arg(long)]
        amount: String,
        /// Token address; native when omitted
        #[arg(long, default_value = "")]
        token: String,
    },
    /// Swap on one chain
    Swap {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        from_token: String,
        #[arg(long)]
        to_token: String,
        #[arg(long)]
        amount: String,
    },
    /// Approve a spender ("max" when no amount)
    Approve {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
        #[arg(long)]
        amount: Option<String>,
    },
    /// Set a spender's allowance to zero
    Revoke {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
    },
    /// Read an allowance
    Allowance {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
    },
    /// List approvals toward well-known spenders
    Approvals {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        owner: String,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
    },
    /// Quote a cross-chain transfer
    BridgeQuote(BridgeArgs),
    /// Quote and execute a cross-chain transfer
    BridgeExecute(BridgeArgs),
    /// Query cross-chain status
    BridgeStatus {
        #[arg(long)]
        tx_hash: String,
        #[arg(long)]
        from_chain: Option<u64>,
        #[arg(long)]
        to_chain: Option<u64>,
        /// Poll until a terminal state
        #[arg(long)]
        poll: bool,
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Chains the aggregator supports
    Chains,
    /// Tokens the aggregator supports
    Tokens {
        #[arg(long = "chain")]
        chains: Vec<u64>,
    },
}

#[derive(clap::Args)]
struct BridgeArgs {
    #[arg(long)]
    from_chain: u64,
    #[arg(long)]
    to_chain: u64,
    #[arg(long)]
    from_token: String,
    #[arg(long)]
    to_token: String,
    #[arg(long)]
    amount: String,
    #[arg(long)]
    from: String,
    #[arg(long, default_value = "")]
    to: String,
    #[arg(long)]
    order: Option<String>,
    #[arg(long)]
    slippage: Option<String>,
}

impl From<BridgeArgs> for BridgeQuoteRequest {
    fn from(args: BridgeArgs) -> Self {
        Self {
            from_chain_id: args.from_chain,
            to_chain_id: args.to_chain,
            from_token: args.from_token,
            to_token: args.to_token,
            from_amount: args.amount,
            from_address: args.from,
            to_address: args.to,
            order: args.order,
            slippage: args.slippage,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    logging::init_tracing(&config.observability.log_level);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let drain_timeout = Duration::from_secs(config.broadcast.drain_timeout_secs);
    let engine = TransactionEngine::from_config(config, Arc::new(EnvKeyProvider))?;

    let output = run(&engine, cli.command).await;

    if !engine.drain(drain_timeout).await {
        tracing::warn!("Exiting with broadcasts still in flight");
    }

    print_output(&output?, cli.json)?;
    Ok(())
}

async fn run(engine: &TransactionEngine, command: Commands) -> Result<Value, Box<dyn std::error::Error>> {
    let value = match command {
        Commands::Send {
            chain,
            from,
            to,
            amount,
            token,
        } => to_value(
            engine
                .send(&SendRequest {
                    from_address: from,
                    to_address: to,
                    chain,
                    from_token: token.clone(),
                    to_token: token,
                    amount,
                })
                .await?,
        )?,
        Commands::Swap {
            chain,
            from,
            to,
            from_token,
            to_token,
            amount,
        } => to_value(
            engine
                .swap(&SwapRequest {
                    from_address: from,
                    to_address: to,
                    chain,
                    from_token,
                    to_token,
                    amount,
                })
                .await?,
        )?,
        Commands::Approve {
            chain,
            token,
            owner,
            spender,
            amount,
        } => to_value(
            engine
                .approve(&ApproveRequest {
                    token_address: token,
                    owner_address: owner,
                    spender_address: spender,
                    chain,
                    amount,
                })
                .await?,
        )?,
        Commands::Revoke {
            chain,
            token,
            owner,
            spender,
        } => to_value(
            engine
                .revoke(&RevokeRequest {
                    token_address: token,
                    owner_address: owner,
                    spender_address: spender,
                    chain,
                })
                .await?,
        )?,
        Commands::Allowance {
            chain,
            token,
            owner,
            spender,
        } => to_value(
            engine
                .check_allowance(&CheckAllowanceRequest {
                    token_address: token,
                    owner_address: owner,
                    spender_address: spender,
                    chain,
                })
                .await?,
        )?,
        Commands::Approvals {
            chain,
            owner,
            tokens,
        } => to_value(
            engine
                .list_approvals(&ListApprovalsRequest {
                    owner_address: owner,
                    chain,
                    tokens,
                })
                .await?,
        )?,
        Commands::BridgeQuote(args) => to_value(engine.bridge_quote(&args.into()).await?)?,
        Commands::BridgeExecute(args) => to_value(engine.bridge_execute(&args.into()).await?)?,
        Commands::BridgeStatus {
            tx_hash,
            from_chain,
            to_chain,
            poll,
            max_attempts,
        } => {
            let request = BridgeStatusRequest {
                tx_hash,
                from_chain_id: from_chain,
                to_chain_id: to_chain,
            };
            let status = if poll {
                engine.bridge_status_polling(&request, max_attempts).await?
            } else {
                engine.bridge_status(&request).await?
            };
            to_value(status)?
        }
        Commands::Chains => engine.supported_chains().await?,
        Commands::Tokens { chains } => engine.supported_tokens(&chains).await?,
    };
    Ok(value)
}

fn to_value<T: Serialize>(value: T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

fn print_output(value: &Value, json: bool) -> Result<(), serde_json::Error> {
    match value {
        Value::Object(fields) if !json => {
            for (key, field) in fields {
                match field {
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}
