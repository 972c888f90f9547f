use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use deploy_bot::cli::{run, Cli};
use deploy_bot::logging::{self, DEFAULT_LOG_FILE};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // LOG_FILE="" turns the file log off.
    let log_file = match std::env::var("LOG_FILE") {
        Ok(path) if path.trim().is_empty() => None,
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => Some(PathBuf::from(DEFAULT_LOG_FILE)),
    };
    let _log_guard = logging::init(log_file.as_deref());
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
