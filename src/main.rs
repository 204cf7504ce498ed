//! Wallet coordinator CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!   primary provider ──┐                      ┌──────────────────────┐
//!                      ├─▶ account reconciler ─▶ ConnectionState (watch)
//!   secondary provider ┘                      └──────────┬───────────┘
//!                                                        │
//!                        ┌───────────────────────────────┼────────────────────┐
//!                        ▼                               ▼                    ▼
//!                 refresh scheduler ──────────▶ token cache (DashMap)   validation
//!                        ▲                               │                    │
//!                        │ success + delay               ▼                    ▼
//!                        └──────────────── transaction controller ──▶ ContractTransport
//!                                          (Idle/Pending/Success/Error)   (JSON-RPC)
//! ```
//!
//! The signer comes from `WALLET_PRIVATE_KEY`; it doubles as the primary
//! connection. `status --owner` inspects any address without a key.

use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use clap::{Parser, Subcommand};

use wallet_coordinator::account::StaticProvider;
use wallet_coordinator::blockchain::{BlockchainClient, RpcTransport, Wallet};
use wallet_coordinator::config::load_config;
use wallet_coordinator::observability::{logging, metrics};
use wallet_coordinator::transaction::{TransactionController, TxError, TxStatus};
use wallet_coordinator::validation::parse_address;
use wallet_coordinator::WalletSession;

#[derive(Parser)]
#[command(name = "wallet-coordinator")]
#[command(about = "ERC-20 approve/transfer coordinator", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "wallet.toml")]
    config: PathBuf,

    /// Owner to inspect instead of the signer (status only)
    #[arg(long)]
    owner: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show connection, token and transaction state
    Status,
    /// Approve the configured spender for AMOUNT
    Approve { amount: String },
    /// Transfer AMOUNT to TO
    Transfer { to: String, amount: String },
    /// Move AMOUNT from the source wallet to the recipient via the spender
    TransferFrom { amount: String },
}

impl Commands {
    fn needs_signer(&self) -> bool {
        !matches!(self, Commands::Status)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("wallet-coordinator v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let wallet = match Wallet::from_env(config.blockchain.chain_id) {
        Ok(wallet) => Some(wallet),
        Err(e) if cli.command.needs_signer() => return Err(e.into()),
        Err(e) => {
            tracing::info!(error = %e, "No signer configured, running read-only");
            None
        }
    };

    let owner: Address = match (&cli.owner, &wallet) {
        (Some(text), _) => {
            parse_address(text).ok_or_else(|| format!("invalid owner address '{text}'"))?
        }
        (None, Some(wallet)) => wallet.address(),
        (None, None) => return Err("set WALLET_PRIVATE_KEY or pass --owner".into()),
    };

    let client = BlockchainClient::new(config.blockchain.clone(), wallet.as_ref()).await?;
    let transport = Arc::new(RpcTransport::new(client));

    let mut session = WalletSession::start(&config, transport)?;
    session.attach_provider(Arc::new(StaticProvider::primary(owner)));

    let mut accounts = session.reconciler().subscribe();
    accounts
        .wait_for(|state| state.active_address() == Some(owner))
        .await?;
    load(&session).await;

    let controller = session.controller().clone();
    let outcome = match cli.command {
        Commands::Status => Ok(()),
        Commands::Approve { amount } => {
            finish(&session, &controller, controller.approve_token(&amount).await).await
        }
        Commands::Transfer { to, amount } => {
            finish(&session, &controller, controller.transfer_token(&to, &amount).await).await
        }
        Commands::TransferFrom { amount } => {
            finish(&session, &controller, controller.transfer_from_contract(&amount).await).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&session.status())?);
    session.shutdown().await;
    tracing::info!("Shutdown complete");
    outcome
}

/// Loads metadata and balances for the connected owner.
async fn load(session: &WalletSession) {
    let cache = session.cache();
    let (metadata, refresh, native) = tokio::join!(
        cache.load_metadata(),
        session.scheduler().refresh_now(),
        async {
            match cache.active_owner() {
                Some(owner) => cache.refresh_native_balance(owner).await.map(|_| ()),
                None => Ok(()),
            }
        },
    );
    if let Err(e) = metadata {
        tracing::warn!(error = %e, "Token metadata unavailable");
    }
    if let Err(e) = refresh {
        tracing::warn!(error = %e, "Balance refresh failed");
    }
    if let Err(e) = native {
        tracing::warn!(error = %e, "Native balance unavailable");
    }
}

/// Waits for a submitted write to settle, then reloads balances.
async fn finish(
    session: &WalletSession,
    controller: &TransactionController,
    submitted: Result<TxHash, TxError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let hash = submitted?;
    tracing::info!(hash = %hash, "Waiting for confirmation");

    let mut records = controller.subscribe();
    let record = records
        .wait_for(|record| record.status.is_terminal())
        .await?
        .clone();

    match record.status {
        TxStatus::Success => {
            load(session).await;
            Ok(())
        }
        _ => Err(record
            .error
            .unwrap_or_else(|| "transaction failed".to_string())
            .into()),
    }
}
