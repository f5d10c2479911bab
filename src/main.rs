//! chatbridge binary entry point.
//!
//! The binary wires configuration, logging, and signal handling around the
//! library's [`Bridge`]. Wire adapters and the agent backend client are
//! supplied by the embedding application; run standalone, the bridge starts
//! with no channels and an unconfigured runtime.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatbridge::agent::UnconfiguredRuntime;
use chatbridge::cli::{run_pairing_command, Cli, Command};
use chatbridge::config::Config;
use chatbridge::store::MemoryStore;
use chatbridge::Bridge;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = Config::resolve(config_path).context("failed to load configuration")?;

    init_tracing(&config.log_level);

    match cli.command {
        Some(Command::Pairing(command)) => {
            // Backed by a fresh in-process store, so this sees no requests
            // from a running bridge until a persistent store is wired in.
            let store = MemoryStore::new();
            run_pairing_command(&store, command).await
        }
        Some(Command::Start) | None => start_bridge(config).await,
    }
}

async fn start_bridge(config: Config) -> anyhow::Result<()> {
    let bridge = Bridge::builder(config, Arc::new(UnconfiguredRuntime)).build();
    bridge.start().await.context("failed to start bridge")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");
    bridge.shutdown().await;
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chatbridge")
        .join("bridge.json")
}
