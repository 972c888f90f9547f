use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GAMES_API_URL: &str = "https://games.roblox.com";
pub const DEFAULT_TEMP_DIR: &str = "./temp";
pub const DEFAULT_LUNE_SCRIPT: &str = "./lune_sync.luau";

/// Coordinates and credentials for the source repository.
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// `owner/name`
    pub repo: String,
    pub branch: String,
    pub api_base_url: String,
}

impl GitHubConfig {
    pub fn new(token: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            api_base_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            repo = %self.repo,
            branch = %self.branch,
            api_base_url = %self.api_base_url,
            token_set = !self.token.is_empty(),
            "Loaded GitHub config"
        );
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Target place and the tooling used to mutate it.
#[derive(Clone)]
pub struct RobloxConfig {
    /// Open Cloud key. Optional at startup, required by download and publish.
    pub api_key: Option<String>,
    pub place_id: u64,
    pub universe_id: u64,
    pub lune_script: PathBuf,
    pub games_api_base_url: String,
}

impl Default for RobloxConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            place_id: 0,
            universe_id: 0,
            lune_script: PathBuf::from(DEFAULT_LUNE_SCRIPT),
            games_api_base_url: DEFAULT_GAMES_API_URL.to_string(),
        }
    }
}

impl RobloxConfig {
    pub fn trace_loaded(&self) {
        info!(
            place_id = self.place_id,
            universe_id = self.universe_id,
            lune_script = %self.lune_script.display(),
            api_key_set = self.api_key.is_some(),
            "Loaded Roblox config"
        );
    }
}

impl std::fmt::Debug for RobloxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RobloxConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("place_id", &self.place_id)
            .field("universe_id", &self.universe_id)
            .field("lune_script", &self.lune_script)
            .field("games_api_base_url", &self.games_api_base_url)
            .finish()
    }
}

/// Local scratch space for one run. Every path lives under `temp_dir`.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub temp_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_DIR)
    }
}

impl WorkspaceConfig {
    pub fn new(temp_dir: impl AsRef<Path>) -> Self {
        Self {
            temp_dir: temp_dir.as_ref().to_path_buf(),
        }
    }

    pub fn place_file(&self) -> PathBuf {
        self.temp_dir.join("place.rbxl")
    }

    pub fn data_files_dir(&self) -> PathBuf {
        self.temp_dir.join("data_files")
    }

    pub fn archive_file(&self) -> PathBuf {
        self.temp_dir.join("repo.zip")
    }

    pub fn trace_loaded(&self) {
        info!(temp_dir = %self.temp_dir.display(), "Loaded workspace config");
    }
}

/// Everything a pipeline run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub github: GitHubConfig,
    pub roblox: RobloxConfig,
    pub workspace: WorkspaceConfig,
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        self.github.trace_loaded();
        self.roblox.trace_loaded();
        self.workspace.trace_loaded();
        debug!(?self, "Sync config loaded (full debug)");
    }
}
