//! Error types for iflowkit-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TenantEnv;

/// All errors that can arise from core metadata, routing and store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parse error on load — includes the file path.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (write path).
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No `.iflowkit/` marker found walking up from the working directory.
    #[error("not inside a sync repository: .iflowkit directory not found")]
    RepoNotFound,

    /// A required metadata / profile / tenant-key field is empty.
    #[error("{file} missing required field: {field}")]
    MissingField { file: String, field: &'static str },

    /// The current git branch is empty (detached or unborn HEAD).
    #[error("cannot resolve tenant from empty branch")]
    EmptyBranch,

    /// `qas` requires a 3-tier landscape.
    #[error("branch 'qas' is not enabled: cpiTenantLevels={levels} (expected 3)")]
    QasNotEnabled { levels: u8 },

    /// `cpiTenantLevels` outside {2,3}.
    #[error("invalid cpiTenantLevels={levels} (expected 2 or 3)")]
    InvalidTenantLevels { levels: u8 },

    /// Branch not in the allow-list; `allowed` already reflects the landscape.
    #[error("branch '{branch}' is not supported by sync (allowed: {allowed})")]
    UnsupportedBranch { branch: String, allowed: String },

    /// PRD safety gate: the operation targets PRD but `--to prd` is absent.
    #[error("refusing to run against PRD without explicit confirmation: pass --to prd")]
    PrdConfirmationRequired,

    /// `--to` was passed for a non-PRD target and does not match it.
    #[error("--to {to} does not match target tenant {tenant}")]
    ToFlagMismatch { to: TenantEnv, tenant: TenantEnv },

    /// An environment string outside dev|qas|prd.
    #[error("invalid environment '{0}' (allowed: dev|qas|prd)")]
    InvalidEnv(String),

    /// No `--profile` flag and no active profile recorded.
    #[error("no profile selected; run `iflowkit profile init` or `iflowkit profile use --id <profileId>`")]
    NoProfileSelected,

    /// The platform config directory could not be determined.
    #[error("cannot determine user config directory")]
    ConfigDirNotFound,

    /// A tenant service key is missing for the resolved profile.
    #[error("{display} tenant not found for profile '{profile}'; import it with `iflowkit tenant import --env {env} --file <service-key.json>`", display = .env.display_upper())]
    TenantKeyMissing { profile: String, env: TenantEnv },

    /// Zip archive error.
    #[error("zip error at {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A zip entry would extract outside the destination directory.
    #[error("zip entry escapes destination: {entry}")]
    UnsafeZipEntry { entry: String },
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
