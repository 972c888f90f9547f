//! `check-env`: a JSON snapshot of the configuration for troubleshooting a
//! deployment. Secrets are masked. Unlike [`crate::load_config`] nothing here
//! fails: missing or malformed values just show up as `null` / `false`.

use std::path::Path;

use deploy_bot_core::config::{DEFAULT_BRANCH, DEFAULT_LUNE_SCRIPT, DEFAULT_TEMP_DIR};
use serde::Serialize;

use crate::load_config::is_valid_repo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct EnvReport {
    pub discord_token: Option<String>,
    pub guild_id: Option<u64>,
    pub github_token: Option<String>,
    pub github_repo: Option<String>,
    pub github_branch: String,
    pub roblox_api_key: Option<String>,
    pub place_id: Option<u64>,
    pub universe_id: Option<u64>,
    pub lune_script_path: String,
    pub temp_dir: String,
    pub allowed_users: Vec<String>,
    pub allowed_roles: Vec<String>,
    #[serde(rename = "exists")]
    pub exists: Exists,
    #[serde(rename = "validations")]
    pub validations: Validations,
}

#[derive(Debug, Serialize)]
pub struct Exists {
    #[serde(rename = "LUNE_SCRIPT_PATH_exists")]
    pub lune_script_path: bool,
    #[serde(rename = "TEMP_DIR_exists")]
    pub temp_dir: bool,
}

#[derive(Debug, Serialize)]
pub struct Validations {
    pub discord_token_present: bool,
    pub guild_id_positive: bool,
    pub github_token_present: bool,
    pub github_repo_format_ok: bool,
    pub github_branch_present: bool,
    pub roblox_api_key_present: bool,
    pub place_id_positive: bool,
    pub universe_id_positive: bool,
    pub lune_script_exists: bool,
}

/// Builds the report from `lookup` (usually `std::env::var`).
pub fn report<F>(lookup: F) -> EnvReport
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let number = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok());
    let list = |key: &str| {
        var(key)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect::<Vec<_>>()
    };

    let discord_token = var("DISCORD_TOKEN");
    let github_token = var("GITHUB_TOKEN");
    let github_repo = var("GITHUB_REPO");
    let github_branch = var("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let roblox_api_key = var("ROBLOX_API_KEY");
    let guild_id = number("GUILD_ID");
    let place_id = number("PLACE_ID");
    let universe_id = number("UNIVERSE_ID");
    let lune_script_path =
        var("LUNE_SCRIPT_PATH").unwrap_or_else(|| DEFAULT_LUNE_SCRIPT.to_string());
    let temp_dir = var("TEMP_DIR").unwrap_or_else(|| DEFAULT_TEMP_DIR.to_string());

    let lune_script_exists = Path::new(&lune_script_path).exists();
    let positive = |id: Option<u64>| id.is_some_and(|id| id > 0);

    let validations = Validations {
        discord_token_present: discord_token.is_some(),
        guild_id_positive: positive(guild_id),
        github_token_present: github_token.is_some(),
        github_repo_format_ok: github_repo.as_deref().is_some_and(is_valid_repo),
        github_branch_present: !github_branch.is_empty(),
        roblox_api_key_present: roblox_api_key.is_some(),
        place_id_positive: positive(place_id),
        universe_id_positive: positive(universe_id),
        lune_script_exists,
    };

    EnvReport {
        discord_token: discord_token.as_deref().map(mask),
        guild_id,
        github_token: github_token.as_deref().map(mask),
        github_repo,
        github_branch,
        roblox_api_key: roblox_api_key.as_deref().map(mask),
        place_id,
        universe_id,
        exists: Exists {
            lune_script_path: lune_script_exists,
            temp_dir: Path::new(&temp_dir).exists(),
        },
        lune_script_path,
        temp_dir,
        allowed_users: list("ALLOWED_USERS"),
        allowed_roles: list("ALLOWED_ROLES"),
        validations,
    }
}

/// Keeps the first and last four characters of long secrets; short ones are
/// hidden entirely.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
