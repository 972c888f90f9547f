//! High-level pipeline: fetch commit → download archive → extract → download
//! place → sync data → publish.
//!
//! # Responsibilities
//! - Runs the six steps in a fixed order and stops at the first failure
//! - Posts one progress line per step through a [`ProgressReporter`]
//! - Always cleans the workspace afterwards, whether the run succeeded or not
//!
//! # Error Handling
//! Every step returns its own error type; [`SyncError`] records which step
//! failed. Nothing is retried.
//!
//! # Navigation
//! - Main entrypoint: [`synchronise`]
//! - Supporting types: [`Step`], [`SyncReport`]

use std::path::PathBuf;

use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{SyncConfig, WorkspaceConfig};
use crate::contract::{CommitInfo, PlaceInfo, PlacePublisher, ProgressReporter, SourceRepository};
use crate::error::{ExtractError, SyncError};
use crate::extract::extract_data_files;

/// The steps of one run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchCommit,
    DownloadRepository,
    ExtractDataFiles,
    DownloadPlace,
    SyncData,
    Publish,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::FetchCommit,
        Step::DownloadRepository,
        Step::ExtractDataFiles,
        Step::DownloadPlace,
        Step::SyncData,
        Step::Publish,
    ];

    /// Line posted when the step starts.
    pub fn progress_message(self, branch: &str) -> String {
        match self {
            Step::FetchCommit => {
                format!("🔄 Fetching latest changes from GitHub... (branch: {branch})")
            }
            Step::DownloadRepository => "📥 Downloading repository...".to_string(),
            Step::ExtractDataFiles => "📂 Extracting data files...".to_string(),
            Step::DownloadPlace => "🎮 Downloading current place file...".to_string(),
            Step::SyncData => "🔄 Syncing data files with Lune...".to_string(),
            Step::Publish => "🚀 Publishing to Roblox...".to_string(),
        }
    }

    /// Label listed in the final report once the step is done.
    pub fn completed_label(self) -> &'static str {
        match self {
            Step::FetchCommit => "Fetched latest changes",
            Step::DownloadRepository => "Downloaded repository",
            Step::ExtractDataFiles => "Extracted data files",
            Step::DownloadPlace => "Downloaded place file",
            Step::SyncData => "Synced with Lune",
            Step::Publish => "Published to Roblox",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub branch: String,
    pub commit: CommitInfo,
    pub files_extracted: Vec<PathBuf>,
    pub steps: Vec<Step>,
    /// Filled from a best-effort lookup after publishing.
    pub place: Option<PlaceInfo>,
}

impl SyncError {
    /// The step that was running when the error happened, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            SyncError::FetchCommit(_) => Some(Step::FetchCommit),
            SyncError::DownloadRepository(_) => Some(Step::DownloadRepository),
            SyncError::ExtractDataFiles(_) | SyncError::NoDataFiles => Some(Step::ExtractDataFiles),
            SyncError::DownloadPlace(_) => Some(Step::DownloadPlace),
            SyncError::SyncData(_) => Some(Step::SyncData),
            SyncError::Publish(_) => Some(Step::Publish),
            SyncError::Busy => None,
        }
    }
}

/// Runs the full pipeline for `branch` (or the repository's default branch
/// when `None`), then cleans up the workspace.
pub async fn synchronise<S, P, R>(
    config: &SyncConfig,
    repo: &S,
    publisher: &P,
    reporter: &R,
    branch: Option<String>,
) -> Result<SyncReport, SyncError>
where
    S: SourceRepository + ?Sized,
    P: PlacePublisher + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let run_id = Uuid::new_v4();
    let branch_name = branch
        .clone()
        .unwrap_or_else(|| config.github.branch.clone());
    let span = tracing::info_span!("sync", %run_id, branch = %branch_name);

    async move {
        info!("[SYNC] Starting synchronisation pipeline");
        let result = run_steps(run_id, &config.workspace, repo, publisher, reporter, branch, &branch_name).await;

        match &result {
            Ok(report) => info!(
                sha = %report.commit.sha,
                files = report.files_extracted.len(),
                "[SYNC] Synchronisation complete"
            ),
            Err(e) => error!(error = %e, step = ?e.step(), "[SYNC][ERROR] Synchronisation failed"),
        }

        if let Err(e) = publisher.cleanup().await {
            warn!(error = %e, "[SYNC] Cleanup failed");
        }

        result
    }
    .instrument(span)
    .await
}

async fn run_steps<S, P, R>(
    run_id: Uuid,
    workspace: &WorkspaceConfig,
    repo: &S,
    publisher: &P,
    reporter: &R,
    branch: Option<String>,
    branch_name: &str,
) -> Result<SyncReport, SyncError>
where
    S: SourceRepository + ?Sized,
    P: PlacePublisher + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let announce = |step: Step| reporter.progress(step.progress_message(branch_name));

    announce(Step::FetchCommit).await;
    let commit = repo
        .latest_commit(branch.clone())
        .await
        .map_err(SyncError::FetchCommit)?;
    info!(sha = %commit.sha, "[SYNC] Latest commit fetched");

    announce(Step::DownloadRepository).await;
    let archive = workspace.archive_file();
    repo.download_archive(branch, &archive)
        .await
        .map_err(SyncError::DownloadRepository)?;

    announce(Step::ExtractDataFiles).await;
    let files = extract_blocking(archive, workspace.data_files_dir())
        .await
        .map_err(SyncError::ExtractDataFiles)?;
    if files.is_empty() {
        return Err(SyncError::NoDataFiles);
    }
    info!(count = files.len(), "[SYNC] Data files extracted");

    announce(Step::DownloadPlace).await;
    publisher
        .download_place()
        .await
        .map_err(SyncError::DownloadPlace)?;

    announce(Step::SyncData).await;
    publisher.sync_data().await.map_err(SyncError::SyncData)?;

    announce(Step::Publish).await;
    publisher.publish_place().await.map_err(SyncError::Publish)?;

    let place = match publisher.place_info().await {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(error = %e, "[SYNC] Place info lookup failed");
            None
        }
    };

    Ok(SyncReport {
        run_id,
        branch: branch_name.to_string(),
        commit,
        files_extracted: files,
        steps: Step::ALL.to_vec(),
        place,
    })
}

async fn extract_blocking(archive: PathBuf, target: PathBuf) -> Result<Vec<PathBuf>, ExtractError> {
    tokio::task::spawn_blocking(move || extract_data_files(&archive, &target))
        .await
        .map_err(|e| ExtractError::Join(e.to_string()))?
}
