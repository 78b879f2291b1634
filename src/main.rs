//! CASTMARKET — Prediction markets on Farcaster social-activity metrics
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the ledger, wires the provider clients into the core
//! services, starts the HTTP API, and runs the auto-settlement sweep
//! with graceful shutdown.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use castmarket::accounting::Accountant;
use castmarket::api;
use castmarket::api::routes::Services;
use castmarket::config::AppConfig;
use castmarket::ledger::Ledger;
use castmarket::market::MarketService;
use castmarket::profiles::ProfileService;
use castmarket::providers::farcaster::NeynarClient;
use castmarket::providers::payments::RpcTransferClient;
use castmarket::settlement::SettlementEngine;
use castmarket::withdrawal::WithdrawalProcessor;

const BANNER: &str = r#"
  ____    _    ____ _____ __  __    _    ____  _  _______ _____
 / ___|  / \  / ___|_   _|  \/  |  / \  |  _ \| |/ / ____|_   _|
| |     / _ \ \___ \ | | | |\/| | / _ \ | |_) | ' /|  _|   | |
| |___ / ___ \ ___) || | | |  | |/ ___ \|  _ <| . \| |___  | |
 \____/_/   \_\____/ |_| |_|  |_/_/   \_\_| \_\_|\_\_____| |_|

  Over/under markets on Farcaster activity
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        port = cfg.server.port,
        base_fee = %cfg.betting.base_fee,
        house_cut = %cfg.betting.house_cut,
        auto_settle = cfg.settlement.auto_settle,
        "CASTMARKET starting up"
    );

    // -- Providers ---------------------------------------------------------

    let neynar_key = AppConfig::resolve_env(&cfg.farcaster.api_key_env)?;
    let neynar = Arc::new(
        NeynarClient::new(cfg.farcaster.hub_url.clone(), SecretString::new(neynar_key))
            .context("Failed to build Neynar client")?,
    );

    let payments_key = AppConfig::resolve_env(&cfg.payments.api_key_env)?;
    let transfers = Arc::new(
        RpcTransferClient::new(
            cfg.payments.rpc_url.clone(),
            SecretString::new(payments_key),
            cfg.payments.timeout_secs,
        )
        .context("Failed to build transfer client")?,
    );

    // -- Core services -----------------------------------------------------

    let ledger = Arc::new(
        Ledger::connect(&cfg.database)
            .await
            .context("Failed to connect ledger")?,
    );

    let fees = cfg.betting.fee_policy();
    let accountant = Accountant::new(ledger.clone());
    let settlement = SettlementEngine::new(
        ledger.clone(),
        neynar.clone(),
        transfers.clone(),
        fees.clone(),
        cfg.treasury.escrow_account.clone(),
        cfg.treasury.treasury_account.clone(),
    );

    let state = Arc::new(Services {
        markets: MarketService::new(
            ledger.clone(),
            transfers.clone(),
            fees.clone(),
            cfg.treasury.escrow_account.clone(),
            cfg.treasury.treasury_account.clone(),
            cfg.betting.min_duration_hours,
            cfg.betting.max_duration_hours,
        ),
        settlement: SettlementEngine::new(
            ledger.clone(),
            neynar.clone(),
            transfers.clone(),
            fees,
            cfg.treasury.escrow_account.clone(),
            cfg.treasury.treasury_account.clone(),
        ),
        accountant: accountant.clone(),
        withdrawals: WithdrawalProcessor::new(
            ledger.clone(),
            accountant,
            transfers,
            cfg.treasury.escrow_account.clone(),
        ),
        profiles: ProfileService::new(
            ledger,
            neynar,
            Duration::from_secs(cfg.farcaster.cache_ttl_secs),
        ),
    });

    api::spawn_server(state, cfg.server.host.clone(), cfg.server.port)?;

    // -- Settlement sweep --------------------------------------------------

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.settlement.interval_secs));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        interval_secs = cfg.settlement.interval_secs,
        "Entering settlement loop. Press Ctrl+C to stop."
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !cfg.settlement.auto_settle {
                    continue;
                }
                match settlement.settle_due().await {
                    Ok(settled) if !settled.is_empty() => {
                        info!(count = settled.len(), markets = ?settled, "Sweep settled markets");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Settlement sweep failed — continuing"),
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!("CASTMARKET shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("castmarket=info"));

    let json_logging = std::env::var("CASTMARKET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
