//! Error types for iflowkit-sync.

use std::path::PathBuf;

use thiserror::Error;

use iflowkit_core::CoreError;
use iflowkit_cpi::CpiError;
use iflowkit_git::{GitError, ProviderError};

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Cpi(#[from] CpiError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport record / index JSON error.
    #[error("transport store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid ignore pattern at {origin}:{line}: {source}")]
    IgnorePattern {
        origin: String,
        line: usize,
        #[source]
        source: regex::Error,
    },

    #[error("transportId is required")]
    TransportIdRequired,

    #[error("cannot read transport record '{transport_id}': {reason}")]
    RecordRead {
        transport_id: String,
        reason: String,
    },

    // --- policy / preflight -------------------------------------------------
    #[error("sync pull is only allowed on environment branches ({allowed}). current={branch}")]
    PullBranchNotAllowed { allowed: String, branch: String },

    #[error("sync push is only allowed on environment branches ({allowed}) and work branches (feature/*, bugfix/*). current={branch}")]
    PushBranchNotAllowed { allowed: String, branch: String },

    #[error("local branch diverged from {remote_ref} (ahead={ahead}, behind={behind}); resolve with rebase/merge before running sync pull")]
    PullDiverged {
        remote_ref: String,
        ahead: u32,
        behind: u32,
    },

    #[error("working tree is not clean ({count} paths). commit/stash changes before running deliver")]
    DirtyWorkingTree { count: usize },

    #[error("--to must be qas or prd")]
    DeliverTargetRequired,

    #[error("qas {operation} is not enabled: cpiTenantLevels={levels} (expected 3)")]
    QasNotEnabled {
        operation: &'static str,
        levels: u8,
    },

    /// Pre-delivery integrity check: the target branch must mirror the
    /// target tenant before a promotion is accepted.
    #[error("{tenant} tenant and {branch} branch differ (after applying .iflowkit/ignore). first diffs: {diffs}")]
    TenantBranchMismatch {
        tenant: String,
        branch: String,
        diffs: String,
    },

    #[error("target branch origin/{0} does not exist")]
    RemoteBranchMissing(String),

    // --- init ---------------------------------------------------------------
    #[error("{0}")]
    InvalidPackageId(String),

    #[error("--dir path does not exist: {0}")]
    ParentDirNotFound(String),

    #[error("--dir is not a directory: {0}")]
    ParentNotADirectory(String),

    #[error("target path exists and is not a directory: {0}")]
    DestinationNotADirectory(String),

    #[error("target directory is not empty: {0}")]
    DestinationNotEmpty(String),

    #[error("CPI IntegrationPackage Name is empty (packageId={0})")]
    EmptyPackageName(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
