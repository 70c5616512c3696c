//! `sync compare` — show content-folder differences between the current
//! branch HEAD and an environment branch on origin.

use std::path::Path;

use iflowkit_core::types::{ArtifactKey, TenantEnv};

use crate::classifier::detect_changed_artifacts;
use crate::error::SyncError;
use crate::ignore::RepoIgnore;

use super::locate_repo;

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub to: TenantEnv,
}

#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub branch: String,
    pub target_ref: String,
    /// Differing artifacts, sorted by `(kind, id)`; empty means in sync.
    pub objects: Vec<ArtifactKey>,
}

pub fn run(cwd: &Path, opts: &CompareOptions) -> Result<CompareOutcome, SyncError> {
    if opts.to == TenantEnv::Dev {
        return Err(SyncError::DeliverTargetRequired);
    }

    let repo = locate_repo(cwd)?;
    let levels = repo.meta.cpi_tenant_levels;
    if opts.to == TenantEnv::Qas && levels != 3 {
        return Err(SyncError::QasNotEnabled {
            operation: "compare",
            levels,
        });
    }
    if opts.to == TenantEnv::Prd && levels != 2 && levels != 3 {
        return Err(iflowkit_core::CoreError::InvalidTenantLevels { levels }.into());
    }

    let branch = repo.git.current_branch().unwrap_or_default();
    tracing::info!(
        repo = %repo.repo_root.display(),
        from = %branch,
        to = %opts.to,
        "sync compare started"
    );

    repo.git.fetch_origin();
    if !repo.git.remote_branch_exists(opts.to.as_str()) {
        return Err(SyncError::RemoteBranchMissing(opts.to.as_str().to_string()));
    }

    let ignore = RepoIgnore::load(&repo.repo_root)?;
    let target_ref = format!("origin/{}", opts.to);
    // Current HEAD (including local commits) against the remote env branch.
    let range = format!("{target_ref}..HEAD");
    let changed_paths = repo
        .git
        .diff_name_only(&range, Some(&repo.content_folder))?;
    let changed_paths = ignore.filter(&changed_paths);
    let keys = detect_changed_artifacts(&repo.content_folder, &changed_paths);

    Ok(CompareOutcome {
        branch,
        target_ref,
        objects: keys.into_iter().collect(),
    })
}
