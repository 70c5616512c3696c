//! `sync push` — publish local changes to git and converge the mapped
//! tenant. Allowed on env branches and work branches; a failed CPI phase
//! leaves a pending transport record that the next run resumes.

use std::path::Path;

use chrono::Utc;

use iflowkit_core::router::{
    allowed_env_branches, is_allowed_push_branch, resolve_target_tenant, validate_to_flag,
};
use iflowkit_core::types::TenantEnv;

use crate::classifier::{detect_changed_artifacts, partition_changed_keys};
use crate::error::SyncError;
use crate::ignore::RepoIgnore;
use crate::transport::{
    build_transport_commit_message, merge_keys, merge_unique_sorted, new_transport_ids,
    TransportRecord, TransportStatus, TransportStore, TransportType,
};

use super::apply::{apply_transport_to_tenant, ApplyCounts};
use super::{locate_repo, EngineContext, LogsFinalizer, RepoContext};

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub to: Option<TenantEnv>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum PushOutcome {
    /// Nothing to push, nothing to delete, no pending retry.
    NoChanges,
    /// Commits were pushed but no CPI-relevant changes existed.
    GitOnly,
    Completed {
        branch: String,
        tenant: TenantEnv,
        deleted: usize,
        updated: usize,
        deployed: usize,
        record_path: String,
    },
}

pub fn run(ctx: &EngineContext, cwd: &Path, opts: &PushOptions) -> Result<PushOutcome, SyncError> {
    let repo = locate_repo(cwd)?;
    let branch = repo.git.current_branch()?;

    if !is_allowed_push_branch(&branch) {
        return Err(SyncError::PushBranchNotAllowed {
            allowed: allowed_env_branches(repo.meta.cpi_tenant_levels),
            branch,
        });
    }
    let decision = resolve_target_tenant(&repo.meta, &branch)?;
    validate_to_flag(opts.to, decision.tenant)?;

    tracing::info!(
        repo = %repo.repo_root.display(),
        branch = %branch,
        tenant = %decision.tenant,
        package_id = %repo.meta.package_id,
        "sync push started"
    );

    let mut finalizer = LogsFinalizer::new(
        repo.git.clone(),
        TransportType::Push,
        &opts.message,
        &branch,
        &repo.content_folder,
    );
    if decision.is_env_branch {
        finalizer.tag_branch = Some(branch.clone());
    }
    let result = run_inner(ctx, &repo, decision.tenant, &branch, opts, &mut finalizer);
    finalizer.finish(result)
}

fn run_inner(
    ctx: &EngineContext,
    repo: &RepoContext,
    tenant: TenantEnv,
    branch: &str,
    opts: &PushOptions,
    finalizer: &mut LogsFinalizer,
) -> Result<PushOutcome, SyncError> {
    let git = &repo.git;
    let (git_user_name, git_user_email) = git.user_identity();

    // Prefer resuming an incomplete push transport (retry after CPI failure).
    let store = TransportStore::new(&repo.repo_root, tenant);
    let pending = store.load_latest_pending(
        Some(&repo.meta.package_id),
        Some(branch),
        Some(TransportType::Push),
    )?;
    let mut transport_id = pending.as_ref().map(|(rec, _)| rec.transport_id.clone());
    let mut planned_created_at = pending.as_ref().map(|(rec, _)| rec.created_at.clone());

    // --- Git phase ---
    git.fetch_origin();
    let upstream_ref = git.upstream_ref();

    // Uncommitted content-folder changes become a strict-format contents commit.
    if git.has_changes_in(&repo.content_folder)? {
        let id = match &transport_id {
            Some(id) => id.clone(),
            None => {
                let (id, created_at) = new_transport_ids(Utc::now());
                planned_created_at = Some(created_at);
                transport_id = Some(id.clone());
                id
            }
        };
        let msg =
            build_transport_commit_message(&id, TransportType::Push, "contents", &opts.message);
        git.commit_pathspec(&msg, &repo.content_folder)?;
    }

    // Changes that are committed but not yet pushed.
    let base_ref = match &upstream_ref {
        Some(r) => Some(r.clone()),
        None if git.remote_branch_exists(branch) => Some(format!("origin/{branch}")),
        None => None,
    };
    let (changed_paths, commits_to_push) = git.pending_changes(base_ref.as_deref(), branch)?;

    let ignore = RepoIgnore::load(&repo.repo_root)?;
    let keys_from_diff =
        detect_changed_artifacts(&repo.content_folder, &ignore.filter(&changed_paths));
    let (keys_to_upload, keys_to_delete) =
        partition_changed_keys(&repo.repo_root, &repo.content_folder, &keys_from_diff);

    if keys_to_upload.is_empty()
        && keys_to_delete.is_empty()
        && commits_to_push.is_empty()
        && pending.is_none()
    {
        return Ok(PushOutcome::NoChanges);
    }

    // Push pending commits (including the one created above).
    if !commits_to_push.is_empty() || upstream_ref.is_none() {
        git.push(branch, upstream_ref.is_none())?;
    }

    // --- Transport plan (persisted for retry) ---
    let mut rec = match pending {
        Some((pending_rec, _)) => {
            let mut rec = pending_rec;
            finalizer.transport_id = Some(rec.transport_id.clone());
            tracing::info!(transport_id = %rec.transport_id, "resuming pending push transport");

            rec.git_commits = merge_unique_sorted(&rec.git_commits, &commits_to_push);
            if rec.git_user_name.is_empty() {
                rec.git_user_name = git_user_name.clone();
            }
            if rec.git_user_email.is_empty() {
                rec.git_user_email = git_user_email.clone();
            }
            if !keys_to_upload.is_empty() {
                rec.upload_remaining =
                    merge_keys(&rec.upload_remaining, keys_to_upload.iter().cloned());
                rec.objects = merge_keys(&rec.objects, keys_to_upload.iter().cloned());
            }
            if !keys_to_delete.is_empty() {
                rec.delete_remaining =
                    merge_keys(&rec.delete_remaining, keys_to_delete.iter().cloned());
                rec.deleted_objects =
                    merge_keys(&rec.deleted_objects, keys_to_delete.iter().cloned());
            }
            // Older pending records may have missed object lists; rebuild
            // from the remaining work.
            if rec.objects.is_empty() && !rec.upload_remaining.is_empty() {
                rec.objects = rec.upload_remaining.clone();
            }
            if rec.deleted_objects.is_empty() && !rec.delete_remaining.is_empty() {
                rec.deleted_objects = rec.delete_remaining.clone();
            }
            if rec.transport_status == TransportStatus::Completed {
                rec.transport_status = TransportStatus::Pending;
            }
            rec
        }
        None => {
            if keys_to_upload.is_empty() && keys_to_delete.is_empty() {
                // Git push done; nothing CPI-relevant changed.
                return Ok(PushOutcome::GitOnly);
            }
            let (id, created_at) = match (transport_id.clone(), planned_created_at.clone()) {
                (Some(id), Some(created_at)) => (id, created_at),
                _ => new_transport_ids(Utc::now()),
            };
            let mut rec = TransportRecord::new(
                &id,
                TransportType::Push,
                &repo.meta.package_id,
                branch,
                &created_at,
            );
            rec.git_commits = commits_to_push;
            rec.git_user_name = git_user_name;
            rec.git_user_email = git_user_email;
            rec.objects = keys_to_upload.iter().cloned().collect();
            rec.deleted_objects = keys_to_delete.iter().cloned().collect();
            rec.upload_remaining = keys_to_upload.into_iter().collect();
            rec.delete_remaining = keys_to_delete.into_iter().collect();
            finalizer.transport_id = Some(id);
            rec
        }
    };

    // Persist the (possibly merged) plan before any CPI side effect.
    let record_path = store.persist(&rec)?;

    // --- CPI phase ---
    let (profile_id, _) = ctx.resolve_profile()?;
    let mut client = ctx.cpi_client(&profile_id, tenant)?;
    let ApplyCounts {
        deleted,
        updated,
        deployed,
    } = apply_transport_to_tenant(&mut client, &repo.repo_root, &repo.meta, &mut rec, &store)?;

    let record_rel = record_path
        .strip_prefix(&repo.repo_root)
        .unwrap_or(&record_path)
        .to_string_lossy()
        .replace('\\', "/");
    tracing::info!(
        branch = %branch,
        tenant = %tenant,
        deleted_artifacts = deleted,
        updated_artifacts = updated,
        deployed_artifacts = deployed,
        "sync push completed"
    );
    Ok(PushOutcome::Completed {
        branch: branch.to_string(),
        tenant,
        deleted,
        updated,
        deployed,
        record_path: record_rel,
    })
}
