pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod tracking;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{dispatch, Cli};
use config::AppConfig;
use db::Database;

pub use clock::{Clock, SystemClock};
pub use tracking::{
    StoreError, TimeReport, TrackingController, TrackingError, TrackingRepository,
};

/// Entry point for the `time-tracker` binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    if let Some(db_path) = cli.db.clone() {
        config.database_path = db_path;
    }

    // RUST_LOG, when set, takes precedence over the environment default.
    env_logger::Builder::new()
        .filter_level(config.environment.default_log_level())
        .parse_default_env()
        .init();

    log::info!(
        "time-tracker starting ({} environment, database {})",
        config.environment,
        config.database_path.display()
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let output = runtime.block_on(async move {
        let database = Database::new(config.database_path)?;
        dispatch(cli.command, database).await
    })?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
