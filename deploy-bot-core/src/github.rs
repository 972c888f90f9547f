//! GitHub REST client for the source repository.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::GitHubConfig;
use crate::contract::{CommitInfo, SourceRepository};
use crate::error::GitHubError;

const USER_AGENT: &str = concat!("deploy-bot/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    config: GitHubConfig,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn default_branch(&self) -> &str {
        &self.config.branch
    }

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.repo,
            tail
        )
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("token {}", self.config.token))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
    }

    async fn send(
        &self,
        url: &str,
        operation: &'static str,
    ) -> Result<reqwest::Response, GitHubError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|source| {
                error!(error = ?source, url = %url, operation, "GitHub request failed");
                GitHubError::Request { operation, source }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, operation, "GitHub API returned error");
            return Err(GitHubError::Status { operation, status });
        }
        Ok(response)
    }
}

#[async_trait]
impl SourceRepository for GitHubClient {
    async fn latest_commit(&self, branch: Option<String>) -> Result<CommitInfo, GitHubError> {
        let branch = branch.unwrap_or_else(|| self.config.branch.clone());
        let url = self.repo_url(&format!("commits/{branch}"));
        info!(repo = %self.config.repo, branch = %branch, "Fetching latest commit");

        let response = self.send(&url, "get latest commit").await?;
        let body: CommitResponse = response.json().await.map_err(|e| GitHubError::Decode {
            what: "commit response",
            detail: e.to_string(),
        })?;

        info!(sha = %body.sha, "Fetched latest commit");
        Ok(CommitInfo {
            sha: body.sha,
            message: body.commit.message,
        })
    }

    async fn download_archive(
        &self,
        branch: Option<String>,
        dest: &Path,
    ) -> Result<(), GitHubError> {
        let branch = branch.unwrap_or_else(|| self.config.branch.clone());
        let url = self.repo_url(&format!("zipball/{branch}"));
        info!(repo = %self.config.repo, branch = %branch, dest = %dest.display(), "Downloading repository archive");

        let response = self.send(&url, "download repository").await?;

        let io_err = |source| GitHubError::Io {
            path: dest.to_path_buf(),
            source,
        };
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| GitHubError::Request {
                operation: "download repository",
                source,
            })?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;

        info!(bytes = written, dest = %dest.display(), "Repository archive downloaded");
        Ok(())
    }

    async fn file_contents(&self, path: &str) -> Result<String, GitHubError> {
        let url = self.repo_url(&format!("contents/{}", path.trim_start_matches('/')));
        debug!(path, "Fetching file contents");

        let response = self.send(&url, "get file contents").await?;
        let body: ContentsResponse = response.json().await.map_err(|e| GitHubError::Decode {
            what: "contents response",
            detail: e.to_string(),
        })?;

        if let Some(encoding) = body.encoding.as_deref().filter(|e| *e != "base64") {
            return Err(GitHubError::Decode {
                what: "file contents",
                detail: format!("unsupported encoding {encoding}"),
            });
        }

        // GitHub wraps the base64 payload at 60 columns.
        let packed: String = body
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(packed).map_err(|e| GitHubError::Decode {
            what: "file contents",
            detail: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| GitHubError::Decode {
            what: "file contents",
            detail: e.to_string(),
        })
    }
}
