use serial_test::serial;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use deploy_bot::load_config::{load_config, load_config_from, DEFAULT_DISCORD_API_URL};

const ALL_VARS: &[&str] = &[
    "DISCORD_TOKEN",
    "GUILD_ID",
    "GITHUB_TOKEN",
    "GITHUB_REPO",
    "GITHUB_BRANCH",
    "GITHUB_API_URL",
    "ROBLOX_API_KEY",
    "ROBLOX_GAMES_API_URL",
    "PLACE_ID",
    "UNIVERSE_ID",
    "TEMP_DIR",
    "LUNE_SCRIPT_PATH",
    "ALLOWED_USERS",
    "ALLOWED_ROLES",
    "DISCORD_API_URL",
];

fn clear_env() {
    for key in ALL_VARS {
        env::remove_var(key);
    }
}

fn from_map(vars: &[(&str, &str)]) -> anyhow::Result<deploy_bot::load_config::AppConfig> {
    let map: HashMap<&str, &str> = vars.iter().copied().collect();
    load_config_from(|key| map.get(key).map(|v| v.to_string()))
}

/// A minimal environment loads with every default applied.
#[test]
#[serial]
fn test_load_config_defaults_from_process_env() {
    clear_env();
    env::set_var("GITHUB_TOKEN", "ghp_test");
    env::set_var("GITHUB_REPO", "owner/repo");

    let config = load_config().expect("Config should load");

    assert_eq!(config.sync.github.repo, "owner/repo");
    assert_eq!(config.sync.github.branch, "main");
    assert_eq!(config.sync.github.api_base_url, "https://api.github.com");
    assert_eq!(config.sync.roblox.place_id, 0);
    assert_eq!(config.sync.roblox.universe_id, 0);
    assert!(config.sync.roblox.api_key.is_none());
    assert_eq!(
        config.sync.roblox.lune_script,
        PathBuf::from("./lune_sync.luau")
    );
    assert_eq!(config.sync.workspace.temp_dir, PathBuf::from("./temp"));
    assert_eq!(config.discord.guild_id, None);
    assert_eq!(config.discord.api_base_url, DEFAULT_DISCORD_API_URL);
    assert!(config.roster.is_unrestricted());
    assert!(config.discord.require_token().is_err());

    clear_env();
}

/// Every variable set explicitly overrides its default.
#[test]
#[serial]
fn test_load_config_full_environment() {
    clear_env();
    env::set_var("DISCORD_TOKEN", "discord-token");
    env::set_var("GUILD_ID", "123456789");
    env::set_var("GITHUB_TOKEN", "ghp_test");
    env::set_var("GITHUB_REPO", "owner/game-data");
    env::set_var("GITHUB_BRANCH", "release");
    env::set_var("ROBLOX_API_KEY", "rbx-key");
    env::set_var("PLACE_ID", "111");
    env::set_var("UNIVERSE_ID", "222");
    env::set_var("TEMP_DIR", "/tmp/deploy-bot");
    env::set_var("LUNE_SCRIPT_PATH", "/opt/sync.luau");
    env::set_var("ALLOWED_USERS", "1, 2");
    env::set_var("ALLOWED_ROLES", "10");

    let config = load_config().expect("Config should load");

    assert_eq!(config.discord.require_token().unwrap(), "discord-token");
    assert_eq!(config.discord.guild_id, Some(123456789));
    assert_eq!(config.sync.github.branch, "release");
    assert_eq!(config.sync.roblox.api_key.as_deref(), Some("rbx-key"));
    assert_eq!(config.sync.roblox.place_id, 111);
    assert_eq!(config.sync.roblox.universe_id, 222);
    assert_eq!(
        config.sync.workspace.data_files_dir(),
        PathBuf::from("/tmp/deploy-bot/data_files")
    );
    assert_eq!(
        config.sync.roblox.lune_script,
        PathBuf::from("/opt/sync.luau")
    );
    assert!(config.roster.permits("2", &[] as &[&str]));
    assert!(config.roster.permits("99", &["10"]));
    assert!(!config.roster.permits("99", &["11"]));

    clear_env();
}

#[test]
fn test_missing_github_token_is_error() {
    let err = from_map(&[("GITHUB_REPO", "owner/repo")]).unwrap_err();
    assert!(err.to_string().contains("GITHUB_TOKEN"));
}

#[test]
fn test_blank_values_count_as_missing() {
    let err = from_map(&[("GITHUB_TOKEN", "   "), ("GITHUB_REPO", "owner/repo")]).unwrap_err();
    assert!(err.to_string().contains("GITHUB_TOKEN"));
}

#[test]
fn test_malformed_repo_is_error() {
    let err = from_map(&[("GITHUB_TOKEN", "t"), ("GITHUB_REPO", "just-a-name")]).unwrap_err();
    assert!(err.to_string().contains("owner/name"));
}

#[test]
fn test_non_numeric_ids_are_errors() {
    for key in ["PLACE_ID", "UNIVERSE_ID", "GUILD_ID"] {
        let err = from_map(&[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_REPO", "owner/repo"),
            (key, "abc"),
        ])
        .unwrap_err();
        assert!(
            err.to_string().contains(&format!("{key} must be a valid integer")),
            "unexpected error for {key}: {err}"
        );
    }
}

#[test]
fn test_guild_id_zero_means_global() {
    let config = from_map(&[
        ("GITHUB_TOKEN", "t"),
        ("GITHUB_REPO", "owner/repo"),
        ("GUILD_ID", "0"),
    ])
    .unwrap();
    assert_eq!(config.discord.guild_id, None);
}

#[test]
fn test_debug_output_redacts_secrets() {
    let config = from_map(&[
        ("DISCORD_TOKEN", "discord-secret"),
        ("GITHUB_TOKEN", "github-secret"),
        ("GITHUB_REPO", "owner/repo"),
        ("ROBLOX_API_KEY", "roblox-secret"),
    ])
    .unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("discord-secret"));
    assert!(!debug.contains("github-secret"));
    assert!(!debug.contains("roblox-secret"));
}
