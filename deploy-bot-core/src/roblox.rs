//! # Roblox publishing client
//!
//! Drives two independently installed tools against the workspace:
//!
//! - `rbxcloud` downloads and uploads the place file through Open Cloud.
//! - `lune` runs the sync script that merges the data files into the place.
//!
//! Preconditions (credentials, files on disk) are checked before anything is
//! spawned, so a misconfigured run fails with a descriptive message rather
//! than with tool output. The games API lookup is the only HTTP call here and
//! it is unauthenticated.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::{RobloxConfig, WorkspaceConfig};
use crate::contract::{PlaceInfo, PlacePublisher, ProcessOutput, ProcessRunner, ToolInvocation};
use crate::error::{PublishError, RunError};
use crate::process::TokioProcessRunner;

const RBXCLOUD: &str = "rbxcloud";
const RBXCLOUD_HINT: &str = "cargo install rbxcloud";
const LUNE: &str = "lune";
const LUNE_HINT: &str = "cargo install lune";

pub struct RobloxClient<R = TokioProcessRunner> {
    config: RobloxConfig,
    workspace: WorkspaceConfig,
    runner: R,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    #[serde(default)]
    data: Vec<PlaceInfo>,
}

impl RobloxClient<TokioProcessRunner> {
    pub fn new(config: RobloxConfig, workspace: WorkspaceConfig) -> Self {
        Self::with_runner(config, workspace, TokioProcessRunner)
    }
}

impl<R: ProcessRunner> RobloxClient<R> {
    pub fn with_runner(config: RobloxConfig, workspace: WorkspaceConfig, runner: R) -> Self {
        Self {
            config,
            workspace,
            runner,
            http: reqwest::Client::new(),
        }
    }

    pub fn place_file(&self) -> PathBuf {
        self.workspace.place_file()
    }

    pub fn data_files_dir(&self) -> PathBuf {
        self.workspace.data_files_dir()
    }

    fn api_key(&self) -> Result<&str, PublishError> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => {
                error!("ROBLOX_API_KEY is missing");
                Err(PublishError::MissingCredential)
            }
        }
    }

    /// Runs `invocation` and turns a missing binary or non-zero exit into a
    /// [`PublishError`] naming `action`.
    async fn run_tool(
        &self,
        invocation: ToolInvocation,
        action: &'static str,
        tool: &'static str,
        hint: &'static str,
    ) -> Result<ProcessOutput, PublishError> {
        let output = match self.runner.run(invocation).await {
            Ok(output) => output,
            Err(RunError::NotFound { program }) => {
                error!(program = %program, hint, "External tool is not installed");
                return Err(PublishError::ToolNotInstalled { tool, hint });
            }
            Err(e) => {
                error!(error = ?e, tool, "Failed to launch external tool");
                return Err(PublishError::Spawn(e));
            }
        };

        if output.success() {
            debug!(tool, action, "External tool succeeded");
            return Ok(output);
        }

        let detail = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        error!(tool, action, status = ?output.status_code, detail = %detail, "External tool failed");
        Err(PublishError::ToolFailed { action, detail })
    }
}

#[async_trait]
impl<R: ProcessRunner> PlacePublisher for RobloxClient<R> {
    async fn download_place(&self) -> Result<(), PublishError> {
        let temp_dir = &self.workspace.temp_dir;
        tokio::fs::create_dir_all(temp_dir)
            .await
            .map_err(|source| PublishError::Io {
                path: temp_dir.clone(),
                source,
            })?;
        let api_key = self.api_key()?;
        let place_file = self.place_file();

        info!(
            place_id = self.config.place_id,
            universe_id = self.config.universe_id,
            output = %place_file.display(),
            "Downloading place file"
        );
        let invocation = ToolInvocation::new(
            RBXCLOUD,
            [
                "place".to_string(),
                "download".to_string(),
                "--place-id".to_string(),
                self.config.place_id.to_string(),
                "--universe-id".to_string(),
                self.config.universe_id.to_string(),
                "--api-key".to_string(),
                api_key.to_string(),
                "--output".to_string(),
                place_file.display().to_string(),
            ],
        );
        self.run_tool(invocation, "download place file", RBXCLOUD, RBXCLOUD_HINT)
            .await?;
        info!(output = %place_file.display(), "Place file downloaded");
        Ok(())
    }

    async fn sync_data(&self) -> Result<(), PublishError> {
        let script = &self.config.lune_script;
        if !script.exists() {
            error!(path = %script.display(), "Lune script not found");
            return Err(PublishError::MissingScript(script.clone()));
        }
        let data_dir = self.data_files_dir();
        if !data_dir.exists() {
            error!(path = %data_dir.display(), "Data files directory not found");
            return Err(PublishError::MissingDataDir(data_dir));
        }
        let place_file = self.place_file();

        info!(
            script = %script.display(),
            place_file = %place_file.display(),
            data_dir = %data_dir.display(),
            "Syncing data files into place"
        );
        let invocation = ToolInvocation::new(
            LUNE,
            [
                "run".to_string(),
                script.display().to_string(),
                "--place-file".to_string(),
                place_file.display().to_string(),
                "--data-dir".to_string(),
                data_dir.display().to_string(),
            ],
        );
        let output = self
            .run_tool(invocation, "sync data files", LUNE, LUNE_HINT)
            .await?;
        if !output.stdout.trim().is_empty() {
            debug!(stdout = %output.stdout.trim(), "Lune output");
        }
        Ok(())
    }

    async fn publish_place(&self) -> Result<(), PublishError> {
        let place_file = self.place_file();
        if !place_file.exists() {
            error!(path = %place_file.display(), "Place file not found");
            return Err(PublishError::MissingPlaceFile(place_file));
        }
        let api_key = self.api_key()?;

        info!(
            place_id = self.config.place_id,
            universe_id = self.config.universe_id,
            file = %place_file.display(),
            "Publishing place"
        );
        let invocation = ToolInvocation::new(
            RBXCLOUD,
            [
                "place".to_string(),
                "upload".to_string(),
                "--universe-id".to_string(),
                self.config.universe_id.to_string(),
                "--place-id".to_string(),
                self.config.place_id.to_string(),
                "--file".to_string(),
                place_file.display().to_string(),
                "--api-key".to_string(),
                api_key.to_string(),
            ],
        );
        self.run_tool(invocation, "publish place", RBXCLOUD, RBXCLOUD_HINT)
            .await?;
        info!(place_id = self.config.place_id, "Place published");
        Ok(())
    }

    async fn place_info(&self) -> Result<PlaceInfo, PublishError> {
        let url = format!(
            "{}/v1/games",
            self.config.games_api_base_url.trim_end_matches('/')
        );
        let universe_id = self.config.universe_id;
        debug!(url = %url, universe_id, "Fetching place info");

        let response = self
            .http
            .get(&url)
            .query(&[("universeIds", universe_id.to_string())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, universe_id, "Games API returned error");
            return Err(PublishError::Status(status));
        }
        let body: GamesResponse = response.json().await?;
        body.data
            .into_iter()
            .next()
            .ok_or(PublishError::NotFound(universe_id))
    }

    async fn cleanup(&self) -> Result<(), PublishError> {
        let temp_dir = &self.workspace.temp_dir;
        match tokio::fs::remove_dir_all(temp_dir).await {
            Ok(()) => {
                info!(path = %temp_dir.display(), "Removed temporary files");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => {
                error!(error = ?source, path = %temp_dir.display(), "Failed to remove temporary files");
                Err(PublishError::Io {
                    path: temp_dir.clone(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockProcessRunner;
    use mockall::predicate::eq;
    use tempfile::tempdir;

    fn config(api_key: Option<&str>, script: PathBuf) -> RobloxConfig {
        RobloxConfig {
            api_key: api_key.map(str::to_string),
            place_id: 111,
            universe_id: 222,
            lune_script: script,
            ..RobloxConfig::default()
        }
    }

    fn ok_output() -> ProcessOutput {
        ProcessOutput {
            status_code: Some(0),
            ..ProcessOutput::default()
        }
    }

    #[tokio::test]
    async fn download_place_runs_rbxcloud_with_expected_arguments() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path().join("work"));
        let place = workspace.place_file().display().to_string();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .with(eq(ToolInvocation::new(
                "rbxcloud",
                [
                    "place", "download", "--place-id", "111", "--universe-id", "222",
                    "--api-key", "key", "--output", place.as_str(),
                ],
            )))
            .times(1)
            .returning(|_| Ok(ok_output()));

        let client =
            RobloxClient::with_runner(config(Some("key"), "s.luau".into()), workspace.clone(), runner);
        client.download_place().await.expect("download should succeed");
        assert!(workspace.temp_dir.is_dir(), "temp dir is created");
    }

    #[tokio::test]
    async fn download_place_without_credential_spawns_nothing() {
        let tmp = tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let client = RobloxClient::with_runner(
            config(None, "s.luau".into()),
            WorkspaceConfig::new(tmp.path()),
            runner,
        );
        let err = client.download_place().await.unwrap_err();
        assert!(matches!(err, PublishError::MissingCredential));
        assert_eq!(err.to_string(), "ROBLOX_API_KEY is missing");
    }

    #[tokio::test]
    async fn missing_rbxcloud_reports_install_hint() {
        let tmp = tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|inv| {
            Err(RunError::NotFound {
                program: inv.program,
            })
        });

        let client = RobloxClient::with_runner(
            config(Some("key"), "s.luau".into()),
            WorkspaceConfig::new(tmp.path()),
            runner,
        );
        let err = client.download_place().await.unwrap_err();
        assert!(matches!(err, PublishError::ToolNotInstalled { tool: "rbxcloud", .. }));
        assert!(err.to_string().contains("cargo install rbxcloud"));
    }

    #[tokio::test]
    async fn download_failure_falls_back_to_stdout() {
        let tmp = tempdir().unwrap();
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_| {
            Ok(ProcessOutput {
                status_code: Some(2),
                stdout: "403 Forbidden".into(),
                stderr: String::new(),
            })
        });

        let client = RobloxClient::with_runner(
            config(Some("key"), "s.luau".into()),
            WorkspaceConfig::new(tmp.path()),
            runner,
        );
        let err = client.download_place().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to download place file: 403 Forbidden");
    }

    #[tokio::test]
    async fn sync_data_requires_script_and_data_dir() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path().join("work"));
        let script = tmp.path().join("lune_sync.luau");

        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();
        let client =
            RobloxClient::with_runner(config(Some("key"), script.clone()), workspace.clone(), runner);

        let err = client.sync_data().await.unwrap_err();
        assert!(matches!(err, PublishError::MissingScript(_)));

        std::fs::write(&script, "-- sync").unwrap();
        let err = client.sync_data().await.unwrap_err();
        assert!(matches!(err, PublishError::MissingDataDir(_)));
    }

    #[tokio::test]
    async fn sync_data_failure_carries_stderr() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path().join("work"));
        std::fs::create_dir_all(workspace.data_files_dir()).unwrap();
        let script = tmp.path().join("lune_sync.luau");
        std::fs::write(&script, "-- sync").unwrap();

        let expected = ToolInvocation::new(
            "lune",
            [
                "run".to_string(),
                script.display().to_string(),
                "--place-file".to_string(),
                workspace.place_file().display().to_string(),
                "--data-dir".to_string(),
                workspace.data_files_dir().display().to_string(),
            ],
        );
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .with(eq(expected))
            .times(1)
            .returning(|_| {
                Ok(ProcessOutput {
                    status_code: Some(1),
                    stdout: String::new(),
                    stderr: "bad schema\n".into(),
                })
            });

        let client = RobloxClient::with_runner(config(Some("key"), script), workspace, runner);
        let err = client.sync_data().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to sync data files: bad schema");
    }

    #[tokio::test]
    async fn publish_requires_place_file_then_credential() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path());
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();

        let client =
            RobloxClient::with_runner(config(None, "s.luau".into()), workspace.clone(), runner);
        let err = client.publish_place().await.unwrap_err();
        assert!(matches!(err, PublishError::MissingPlaceFile(_)));

        std::fs::write(workspace.place_file(), b"rbxl").unwrap();
        let err = client.publish_place().await.unwrap_err();
        assert!(matches!(err, PublishError::MissingCredential));
    }

    #[tokio::test]
    async fn publish_runs_rbxcloud_upload() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path());
        std::fs::write(workspace.place_file(), b"rbxl").unwrap();
        let place = workspace.place_file().display().to_string();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(move |inv| {
                inv.program == "rbxcloud"
                    && inv.args[..2] == ["place", "upload"]
                    && inv.args.windows(2).any(|w| w[0] == "--file" && w[1] == place)
            })
            .times(1)
            .returning(|_| Ok(ok_output()));

        let client = RobloxClient::with_runner(config(Some("key"), "s.luau".into()), workspace, runner);
        client.publish_place().await.expect("publish should succeed");
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let tmp = tempdir().unwrap();
        let workspace = WorkspaceConfig::new(tmp.path().join("work"));
        std::fs::create_dir_all(workspace.data_files_dir().join("nested")).unwrap();
        std::fs::write(workspace.place_file(), b"rbxl").unwrap();

        let client = RobloxClient::with_runner(
            config(None, "s.luau".into()),
            workspace.clone(),
            MockProcessRunner::new(),
        );
        client.cleanup().await.expect("first cleanup");
        assert!(!workspace.temp_dir.exists());
        client.cleanup().await.expect("second cleanup is a no-op");
    }

    #[tokio::test]
    async fn place_info_returns_first_entry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/games")
            .match_query(mockito::Matcher::UrlEncoded("universeIds".into(), "222".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":222,"rootPlaceId":111,"name":"Obby","visits":5,"playing":1}]}"#)
            .create_async()
            .await;

        let cfg = RobloxConfig {
            games_api_base_url: server.url(),
            ..config(None, "s.luau".into())
        };
        let client = RobloxClient::with_runner(cfg, WorkspaceConfig::default(), MockProcessRunner::new());
        let info = client.place_info().await.expect("place info");
        assert_eq!(info.name, "Obby");
        assert_eq!(info.root_place_id, Some(111));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn place_info_with_empty_data_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/games")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create_async()
            .await;

        let cfg = RobloxConfig {
            games_api_base_url: server.url(),
            ..config(None, "s.luau".into())
        };
        let client = RobloxClient::with_runner(cfg, WorkspaceConfig::default(), MockProcessRunner::new());
        let err = client.place_info().await.unwrap_err();
        assert!(matches!(err, PublishError::NotFound(222)));
    }
}
