//! # deploy-bot CLI
//!
//! Command parsing and orchestration for the binary. Everything the commands
//! actually do lives in `deploy-bot-core` (the pipeline) and [`crate::discord`]
//! (the bot surface); this module wires configuration into them.
//!
//! ## Commands
//! - `run` (the default): connect to Discord and serve `/sync` until Ctrl-C
//! - `sync [--branch B]`: run the pipeline once, progress on stdout
//! - `file <PATH>`: print one file from the configured repository
//! - `check-env`: print the configuration as JSON with secrets masked
//!
//! For programmatic and integration use, call [`run`] with a constructed [`Cli`].

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use deploy_bot_core::contract::{ProgressReporter, SourceRepository};
use deploy_bot_core::github::GitHubClient;
use deploy_bot_core::roblox::RobloxClient;
use deploy_bot_core::synchronise::synchronise;
use tokio_util::sync::CancellationToken;

use crate::check_env;
use crate::discord::{DiscordHttp, Gateway, SyncCommand};
use crate::load_config::{load_config, AppConfig};

/// CLI for deploy-bot: sync data files from GitHub into a Roblox place.
#[derive(Parser)]
#[clap(
    name = "deploy-bot",
    version,
    about = "Discord bot that syncs data files from a GitHub repository into a Roblox place"
)]
pub struct Cli {
    /// Defaults to `run`.
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to Discord and serve the /sync command
    Run,
    /// Run one sync from the terminal
    Sync {
        /// Branch to sync from; defaults to GITHUB_BRANCH
        #[clap(long)]
        branch: Option<String>,
    },
    /// Print a file from the configured repository
    File {
        /// Path inside the repository, e.g. data/items.json
        path: String,
    },
    /// Print the configuration (secrets masked) and validation results as JSON
    CheckEnv,
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::CheckEnv => {
            let report = check_env::report(|key| std::env::var(key).ok());
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Run => serve(load_config()?).await,
        Commands::Sync { branch } => sync_once(load_config()?, branch).await,
        Commands::File { path } => {
            let config = load_config()?;
            let client = GitHubClient::new(config.sync.github);
            let contents = client
                .file_contents(&path)
                .await
                .with_context(|| format!("Failed to fetch {path}"))?;
            print!("{contents}");
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let token = config.discord.require_token()?.to_string();
    tracing::info!(command = "run", "Starting Discord bot");

    let http = Arc::new(DiscordHttp::new(
        token.clone(),
        config.discord.api_base_url.clone(),
    ));
    let repo = GitHubClient::new(config.sync.github.clone());
    let publisher = RobloxClient::new(config.sync.roblox.clone(), config.sync.workspace.clone());
    let command = SyncCommand::new(
        config.sync,
        config.roster,
        repo,
        publisher,
        Arc::clone(&http),
    );
    let gateway = Gateway::new(token, config.discord.guild_id, http, Arc::new(command));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Unable to listen for Ctrl-C"),
        }
    });

    gateway.run(cancel).await
}

async fn sync_once(config: AppConfig, branch: Option<String>) -> Result<()> {
    tracing::info!(command = "sync", ?branch, "Starting synchronisation process");
    let repo = GitHubClient::new(config.sync.github.clone());
    let publisher = RobloxClient::new(config.sync.roblox.clone(), config.sync.workspace.clone());

    match synchronise(&config.sync, &repo, &publisher, &StdoutReporter, branch).await {
        Ok(report) => {
            println!("✅ Sync Completed Successfully!");
            println!("Commit: {}", report.commit.short_sha());
            println!("Message: {}", report.commit.message);
            println!("Data files: {}", report.files_extracted.len());
            if let Some(place) = &report.place {
                println!("Place: {}", place.name);
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Sync Failed");
            Err(anyhow::Error::new(e).context("Synchronisation failed"))
        }
    }
}

/// Prints progress lines for terminal runs.
struct StdoutReporter;

#[async_trait]
impl ProgressReporter for StdoutReporter {
    async fn progress(&self, message: String) {
        println!("{message}");
    }
}
