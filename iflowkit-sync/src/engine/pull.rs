//! `sync pull` — refresh the local repo from the mapped tenant and push
//! the tenant state to `origin/<branch>`. Env branches only.

use std::path::Path;

use chrono::Utc;

use iflowkit_core::fsio::ensure_dir;
use iflowkit_core::router::{allowed_env_branches, resolve_target_tenant, validate_to_flag};
use iflowkit_core::types::TenantEnv;
use iflowkit_cpi::CpiClient;

use crate::classifier::{detect_changed_artifacts, list_local_artifact_keys};
use crate::error::{io_err, SyncError};
use crate::ignore::RepoIgnore;
use crate::transport::{
    build_transport_commit_message, merge_unique_sorted, new_transport_ids, TransportRecord,
    TransportStore, TransportType,
};

use super::{locate_repo, EngineContext, LogsFinalizer, RepoContext};

#[derive(Debug, Clone)]
pub struct PullOptions {
    pub to: Option<TenantEnv>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum PullOutcome {
    /// Local state already matches the tenant.
    UpToDate { tenant: TenantEnv },
    Completed {
        tenant: TenantEnv,
        branch: String,
        changed: usize,
        deleted: usize,
        record_path: String,
        /// Number of working-tree paths stashed before the export.
        stashed: Option<usize>,
    },
}

pub fn run(ctx: &EngineContext, cwd: &Path, opts: &PullOptions) -> Result<PullOutcome, SyncError> {
    let repo = locate_repo(cwd)?;
    let branch = repo.git.current_branch()?;

    let decision = resolve_target_tenant(&repo.meta, &branch)?;
    if !decision.is_env_branch {
        return Err(SyncError::PullBranchNotAllowed {
            allowed: allowed_env_branches(repo.meta.cpi_tenant_levels),
            branch,
        });
    }
    validate_to_flag(opts.to, decision.tenant)?;

    tracing::info!(
        repo = %repo.repo_root.display(),
        branch = %branch,
        tenant = %decision.tenant,
        package_id = %repo.meta.package_id,
        "sync pull started"
    );

    let mut finalizer = LogsFinalizer::new(
        repo.git.clone(),
        TransportType::Pull,
        &opts.message,
        &branch,
        &repo.content_folder,
    );
    let result = run_inner(ctx, &repo, decision.tenant, &branch, opts, &mut finalizer);
    finalizer.finish(result)
}

fn run_inner(
    ctx: &EngineContext,
    repo: &RepoContext,
    tenant: TenantEnv,
    branch: &str,
    opts: &PullOptions,
    finalizer: &mut LogsFinalizer,
) -> Result<PullOutcome, SyncError> {
    let git = &repo.git;

    // --- Git preflight ---
    git.fetch_origin_branch(branch);
    let remote_ref = format!("origin/{branch}");
    if git.remote_branch_exists(branch) {
        let (behind, ahead) = git.ahead_behind(&remote_ref, "HEAD");
        if behind > 0 && ahead > 0 {
            return Err(SyncError::PullDiverged {
                remote_ref,
                ahead,
                behind,
            });
        }
        if behind > 0 {
            git.run(&["merge", "--ff-only", &remote_ref])?;
        }
    }

    // Stash local work (except transport records) so the content folder can
    // be overwritten safely.
    let dirty = filter_non_transport_changes(&git.porcelain_paths());
    let mut stashed = None;
    if !dirty.is_empty() {
        let (_, created_at) = new_transport_ids(Utc::now());
        let stash_msg = format!("iflowkit sync pull {created_at}");
        tracing::info!(paths = dirty.len(), message = %stash_msg, "working tree has local changes; stashing");
        git.stash_push(&stash_msg)?;
        stashed = Some(dirty.len());
    }

    // --- CPI phase (mapped tenant) ---
    let (profile_id, _) = ctx.resolve_profile()?;
    let tenant_key = ctx.tenant_key(&profile_id, tenant)?;
    let mut client = CpiClient::new(&tenant_key);
    let (_, raw) = client.read_integration_package(&repo.meta.package_id)?;

    // Inventory before the overwrite, to detect CPI-side deletions.
    let before_keys = list_local_artifact_keys(&repo.repo_root, &repo.content_folder);

    let base_abs = repo.repo_root.join(&repo.content_folder);
    match std::fs::remove_dir_all(&base_abs) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&base_abs, e)),
    }
    ensure_dir(&base_abs)?;
    client.export_integration_package_from_raw(&repo.meta.package_id, &raw, &base_abs)?;

    let after_keys = list_local_artifact_keys(&repo.repo_root, &repo.content_folder);
    let deleted_keys: std::collections::BTreeSet<_> =
        before_keys.difference(&after_keys).cloned().collect();

    // Changed paths (tracked diffs + untracked) against current HEAD.
    let changed_paths = merge_unique_sorted(&git.worktree_changed_paths(), &git.untracked_paths());
    if changed_paths.is_empty() {
        tracing::info!(tenant = %tenant, "already up to date");
        return Ok(PullOutcome::UpToDate { tenant });
    }

    let ignore = RepoIgnore::load(&repo.repo_root)?;
    let keys = detect_changed_artifacts(&repo.content_folder, &ignore.filter(&changed_paths));
    let keys: std::collections::BTreeSet<_> = keys.difference(&deleted_keys).cloned().collect();

    // Transport id first, so the contents commit carries the strict format.
    let (transport_id, created_at) = new_transport_ids(Utc::now());

    let contents_msg = build_transport_commit_message(
        &transport_id,
        TransportType::Pull,
        "contents",
        &opts.message,
    );
    git.commit_pathspec(&contents_msg, &repo.content_folder)?;

    let commits_to_push = git.commits_to_push(branch);
    let (git_user_name, git_user_email) = git.user_identity();

    let mut rec = TransportRecord::new(
        &transport_id,
        TransportType::Pull,
        &repo.meta.package_id,
        branch,
        &created_at,
    );
    rec.git_commits = commits_to_push;
    rec.git_user_name = git_user_name;
    rec.git_user_email = git_user_email;
    rec.objects = keys.into_iter().collect();
    rec.deleted_objects = deleted_keys.into_iter().collect();

    let store = TransportStore::new(&repo.repo_root, tenant);
    let record_path = store.persist(&rec)?;
    finalizer.transport_id = Some(transport_id.clone());

    if let Err(err) = git.push(branch, false) {
        rec.mark_failed(err.to_string());
        let _ = store.persist(&rec);
        return Err(err.into());
    }

    rec.mark_completed();
    store.persist(&rec)?;

    let record_rel = record_path
        .strip_prefix(&repo.repo_root)
        .unwrap_or(&record_path)
        .to_string_lossy()
        .replace('\\', "/");
    tracing::info!(
        branch = %branch,
        tenant = %tenant,
        deleted_objects = rec.deleted_objects.len(),
        changed_objects = rec.objects.len(),
        "sync pull completed"
    );
    Ok(PullOutcome::Completed {
        tenant,
        branch: branch.to_string(),
        changed: rec.objects.len(),
        deleted: rec.deleted_objects.len(),
        record_path: record_rel,
        stashed,
    })
}

/// Drop paths under `.iflowkit/transports/` from a working-tree change
/// list; pending transport records never force a stash.
fn filter_non_transport_changes(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.trim().replace('\\', "/"))
        .filter(|p| {
            !p.is_empty()
                && !p.starts_with(".iflowkit/transports/")
                && p != ".iflowkit/transports"
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transport_paths_never_force_a_stash() {
        let filtered = filter_non_transport_changes(&strings(&[
            ".iflowkit/transports/dev/index.json",
            ".iflowkit/transports",
            ".iflowkit/package.json",
            "IntegrationPackage/iFlows/X/file",
            "",
        ]));
        assert_eq!(
            filtered,
            strings(&[".iflowkit/package.json", "IntegrationPackage/iFlows/X/file"])
        );
    }
}
