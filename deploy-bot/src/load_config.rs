//! `load_config` module: reads the process environment once and builds the
//! immutable configuration every component is constructed from.
//!
//! # Responsibilities
//! - Read secrets and coordinates from environment variables (a `.env` file is
//!   loaded by `main` before this runs)
//! - Apply defaults for optional values
//! - Fail loudly on missing credentials or malformed numbers, so the process
//!   exits before connecting anywhere
//!
//! # Errors
//! All errors use `anyhow::Error` and are surfaced at the CLI boundary.

use anyhow::{anyhow, Result};
use deploy_bot_core::auth::Roster;
use deploy_bot_core::config::{
    GitHubConfig, RobloxConfig, SyncConfig, WorkspaceConfig, DEFAULT_BRANCH,
    DEFAULT_GAMES_API_URL, DEFAULT_GITHUB_API_URL, DEFAULT_LUNE_SCRIPT, DEFAULT_TEMP_DIR,
};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{error, info};

/// Discord connection settings.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Only the `run` command needs it; see [`DiscordConfig::require_token`].
    pub token: Option<String>,
    /// Guild to register the command in; `None` registers it globally.
    pub guild_id: Option<u64>,
    pub api_base_url: String,
}

impl DiscordConfig {
    pub fn require_token(&self) -> Result<&str> {
        match self.token.as_deref() {
            Some(token) => Ok(token),
            None => {
                error!("DISCORD_TOKEN is missing. Check your .env file.");
                Err(anyhow!("DISCORD_TOKEN is missing. Check your .env file."))
            }
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("guild_id", &self.guild_id)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub sync: SyncConfig,
    pub roster: Roster,
}

/// Loads the configuration from the process environment.
pub fn load_config() -> Result<AppConfig> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Loads the configuration through `lookup`, which returns a variable's value
/// or `None` when unset.
pub fn load_config_from<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let github_token = required(&var, "GITHUB_TOKEN")?;
    let github_repo = required(&var, "GITHUB_REPO")?;
    if !is_valid_repo(&github_repo) {
        error!(repo = %github_repo, "GITHUB_REPO must look like owner/name");
        return Err(anyhow!(
            "GITHUB_REPO must look like owner/name, got {github_repo:?}"
        ));
    }

    let github = GitHubConfig {
        token: github_token,
        repo: github_repo,
        branch: var("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        api_base_url: var("GITHUB_API_URL").unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
    };

    let roblox = RobloxConfig {
        api_key: var("ROBLOX_API_KEY"),
        place_id: numeric(&var, "PLACE_ID")?,
        universe_id: numeric(&var, "UNIVERSE_ID")?,
        lune_script: PathBuf::from(
            var("LUNE_SCRIPT_PATH").unwrap_or_else(|| DEFAULT_LUNE_SCRIPT.to_string()),
        ),
        games_api_base_url: var("ROBLOX_GAMES_API_URL")
            .unwrap_or_else(|| DEFAULT_GAMES_API_URL.to_string()),
    };

    let workspace =
        WorkspaceConfig::new(var("TEMP_DIR").unwrap_or_else(|| DEFAULT_TEMP_DIR.to_string()));

    let guild_id = numeric(&var, "GUILD_ID")?;
    let discord = DiscordConfig {
        token: var("DISCORD_TOKEN"),
        guild_id: (guild_id > 0).then_some(guild_id),
        api_base_url: var("DISCORD_API_URL").unwrap_or_else(|| DEFAULT_DISCORD_API_URL.to_string()),
    };

    let roster = Roster::from_csv(
        &var("ALLOWED_USERS").unwrap_or_default(),
        &var("ALLOWED_ROLES").unwrap_or_default(),
    );

    let sync = SyncConfig {
        github,
        roblox,
        workspace,
    };
    sync.trace_loaded();
    info!(
        guild_id = ?discord.guild_id,
        discord_token_set = discord.token.is_some(),
        unrestricted = roster.is_unrestricted(),
        "Config loaded successfully"
    );

    Ok(AppConfig {
        discord,
        sync,
        roster,
    })
}

static REPO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("valid regex"));

/// True for `owner/name` repository coordinates.
pub fn is_valid_repo(repo: &str) -> bool {
    REPO_PATTERN.is_match(repo)
}

fn required<F>(var: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => {
            info!(key, "Found required environment variable");
            Ok(value)
        }
        None => {
            error!(key, "Required environment variable not set");
            Err(anyhow!("{key} environment variable not set"))
        }
    }
}

/// Parses an optional numeric variable; unset means 0.
fn numeric<F>(var: &F, key: &str) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(0),
        Some(raw) => raw.parse::<u64>().map_err(|e| {
            error!(error = ?e, key, raw = %raw, "Environment variable must be a valid integer");
            anyhow!("{key} must be a valid integer: {e}")
        }),
    }
}
