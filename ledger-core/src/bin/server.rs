//! Ledger service binary
//!
//! Opens the ledger from environment configuration and runs until
//! interrupted. The API surface (HTTP, queue consumption) lives in the
//! embedding services; this binary exists for local operation and
//! smoke testing.

use ledger_core::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Collective Ledger");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config)?;
    tracing::info!("Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    drop(ledger);
    tracing::info!("Shutting down ledger");
    Ok(())
}
