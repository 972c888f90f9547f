//! # contract: the seams between the pipeline and the outside world
//!
//! The sync pipeline talks to three external systems: the source-control API,
//! the publishing tools for the place file, and whatever surface shows progress
//! to the person who asked for the sync. Each one sits behind a trait here so
//! the pipeline can be driven by real clients in production and by mocks in
//! tests.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; with the default
//!   `test-export-mocks` feature the generated `Mock*` types are public so the
//!   binary crate can use them too.
//! - [`ProcessRunner`] isolates process spawning, so the publishing client can be
//!   tested without `rbxcloud` or `lune` installed.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{GitHubError, PublishError, RunError};

/// The head commit of a branch, as reported by the source-control API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
}

impl CommitInfo {
    /// First seven characters of the hash, the usual display form.
    pub fn short_sha(&self) -> &str {
        match self.sha.char_indices().nth(7) {
            Some((idx, _)) => &self.sha[..idx],
            None => &self.sha,
        }
    }
}

/// Public metadata for a game, from the games API. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceInfo {
    pub id: u64,
    #[serde(default)]
    pub root_place_id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visits: Option<u64>,
    #[serde(default)]
    pub playing: Option<u64>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// One external command line: program name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub status_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

/// Source-control API client: the three remote calls the pipeline needs.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Head commit of `branch`, or of the configured default branch when `None`.
    async fn latest_commit(&self, branch: Option<String>) -> Result<CommitInfo, GitHubError>;

    /// Download the branch archive and write it to `dest`.
    async fn download_archive(&self, branch: Option<String>, dest: &Path)
        -> Result<(), GitHubError>;

    /// Raw UTF-8 contents of one file at the default branch.
    async fn file_contents(&self, path: &str) -> Result<String, GitHubError>;
}

/// Publishing client for the hosted place file.
///
/// Paths (place file, data directory, temp root) are fixed at construction, so
/// the operations take no arguments.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PlacePublisher: Send + Sync {
    /// Download the current place file into the workspace.
    async fn download_place(&self) -> Result<(), PublishError>;

    /// Merge the extracted data files into the downloaded place file.
    async fn sync_data(&self) -> Result<(), PublishError>;

    /// Upload and publish the updated place file.
    async fn publish_place(&self) -> Result<(), PublishError>;

    /// Read-only lookup of the place's public metadata.
    async fn place_info(&self) -> Result<PlaceInfo, PublishError>;

    /// Delete the workspace directory tree. Succeeds when it is already gone.
    async fn cleanup(&self) -> Result<(), PublishError>;
}

/// Spawns an external process and waits for it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: ToolInvocation) -> Result<ProcessOutput, RunError>;
}

/// Receives one human-readable line per pipeline step.
///
/// Implementations should swallow their own delivery failures: progress is
/// informational and never aborts a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn progress(&self, message: String);
}
