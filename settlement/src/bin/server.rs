//! Banco ledger service binary
//!
//! Starts the ledger engine on a durable store, wires the settlement
//! notifier and its reconciliation sweep, optionally seeds accounts,
//! and runs until ctrl-c. Exits non-zero on unrecoverable startup
//! failure (for example, an unreachable store).

use banco_ledger::{AccountId, Config, LedgerEngine, RocksStore};
use banco_settlement::{spawn_notifier, HttpSettlementApi, NotifierConfig};
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::{interval, Duration};

#[derive(Debug, Deserialize)]
struct SeedFile {
    accounts: Vec<SeedAccount>,
}

#[derive(Debug, Deserialize)]
struct SeedAccount {
    id: String,
    balance_minor: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Banco ledger service");

    // Load configuration: optional file, then env overrides
    let ledger_config = match std::env::var("BANCO_CONFIG") {
        Ok(path) => Config::from_file(path)?,
        Err(_) => Config::from_env()?,
    };
    let notifier_config = match std::env::var("BANCO_SETTLEMENT_CONFIG") {
        Ok(path) => NotifierConfig::from_file(path)?,
        Err(_) => NotifierConfig::from_env()?,
    };

    // Open the durable store
    let store = Arc::new(RocksStore::open(&ledger_config)?);
    tracing::info!("Ledger store opened at {:?}", ledger_config.data_dir);

    // Wire the settlement notifier
    let api = Arc::new(HttpSettlementApi::new(&notifier_config)?);
    let sweep_interval = notifier_config.sweep_interval_secs;
    let (settlement_tx, notifier_handle) = spawn_notifier(api, notifier_config)?;

    let engine =
        LedgerEngine::new(store, ledger_config.engine.clone())?.with_settlement(settlement_tx);

    // Optionally seed accounts
    if let Ok(path) = std::env::var("BANCO_SEED_FILE") {
        seed_accounts(&engine, &path).await?;
    }

    // Periodic reconciliation sweep for undelivered notices
    let sweeper = notifier_handle.notifier();
    let sweep_task = tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(sweep_interval));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !sweeper.dead_letters().is_empty() {
                sweeper.sweep().await;
            }
        }
    });

    tracing::info!("Banco ledger service ready");
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    sweep_task.abort();
    drop(engine); // Releases the notice sender so the worker drains
    notifier_handle.wait().await;

    Ok(())
}

async fn seed_accounts(engine: &LedgerEngine, path: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let seed: SeedFile = toml::from_str(&content)?;

    for account in seed.accounts {
        let id = AccountId::new(account.id);
        match engine.open_account(id.clone(), account.balance_minor).await {
            Ok(_) => tracing::info!(account_id = %id, "Seeded account"),
            Err(banco_ledger::Error::AccountExists(_)) => {
                tracing::debug!(account_id = %id, "Account already present, skipping seed");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
