//! # GMP Relayer
//!
//! A cross-chain message relayer for a general-message-passing protocol.
//! It observes gateway events on a connected chain, tracks message and
//! gas-payment lifecycles, and executes approved messages on-chain in
//! nonce-sequenced batches.
//!
//! ## Architecture
//!
//! Everything runs inside an apalis worker monitor:
//! - Cron sweeps drive execution, reconciliation, verification dispatch,
//!   and treasury upkeep, each guarded by a cluster-wide Redis lock.
//! - A Redis-backed queue delivers operator alerts.
//!
//! ## Usage
//!
//! ```bash
//! cargo run
//! ```

use color_eyre::{eyre::WrapErr, Result};
use dotenvy::dotenv;
use log::info;

use config::RelayerConfig;
use init::{initialize_app_state, initialize_workers};
use logging::setup_logging;

mod config;
mod constants;
mod domain;
mod init;
mod jobs;
mod logging;
mod models;
mod repositories;
mod services;
mod utils;

pub use models::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().wrap_err("Failed to initialize error reporting")?;

    dotenv().ok();
    setup_logging();

    let config = RelayerConfig::from_env().wrap_err("Failed to load configuration")?;
    info!(
        "Starting relayer for chain {} (id {})",
        config.chain_name, config.chain_id
    );

    let (app_state, queue) = initialize_app_state(config).await?;

    initialize_workers(app_state, queue).await?;

    Ok(())
}
