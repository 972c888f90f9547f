//! Error types for every stage of the sync pipeline.
//!
//! Each collaborator has its own enum so a caller can see, from the signature
//! alone, how a step can fail. [`SyncError`] wraps them per pipeline step.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the source-control API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Failed to {operation}: request error: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-2xx status.
    #[error("Failed to {operation}: {status}")]
    Status {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode {what}: {detail}")]
    Decode { what: &'static str, detail: String },

    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures spawning an external process.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{program} not found on PATH")]
    NotFound { program: String },

    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the publishing client (place download, data sync, publish).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("ROBLOX_API_KEY is missing")]
    MissingCredential,

    #[error("Lune script not found at {}", .0.display())]
    MissingScript(PathBuf),

    #[error("Data files directory not found at {}", .0.display())]
    MissingDataDir(PathBuf),

    #[error("Place file not found at {}", .0.display())]
    MissingPlaceFile(PathBuf),

    #[error("{tool} not found. Please install: {hint}")]
    ToolNotInstalled {
        tool: &'static str,
        hint: &'static str,
    },

    /// The tool ran and exited non-zero; `detail` carries its error output.
    #[error("Failed to {action}: {detail}")]
    ToolFailed { action: &'static str, detail: String },

    #[error(transparent)]
    Spawn(RunError),

    #[error("Failed to get place info: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to get place info: {0}")]
    Status(reqwest::StatusCode),

    #[error("No place found for universe {0}")]
    NotFound(u64),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while pulling data files out of the downloaded archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extraction task aborted: {0}")]
    Join(String),
}

/// A pipeline run failed. The variant names the step that failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    FetchCommit(#[source] GitHubError),

    #[error("{0}")]
    DownloadRepository(#[source] GitHubError),

    #[error("{0}")]
    ExtractDataFiles(#[source] ExtractError),

    #[error("No data files found in repository archive")]
    NoDataFiles,

    #[error("{0}")]
    DownloadPlace(#[source] PublishError),

    #[error("{0}")]
    SyncData(#[source] PublishError),

    #[error("{0}")]
    Publish(#[source] PublishError),

    #[error("A sync is already running, try again when it finishes")]
    Busy,
}
