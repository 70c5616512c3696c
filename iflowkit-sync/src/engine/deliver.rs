//! `sync deliver` — promote between environment branches (dev→qas,
//! qas→prd, dev→prd depending on the landscape) and converge the target
//! tenant.
//!
//! Before a promotion is accepted, the target branch must be a faithful
//! mirror of the target tenant (folder comparison, ignore-filtered); a
//! non-empty diff aborts with the first differing paths.

use std::path::Path;

use chrono::Utc;

use iflowkit_core::router::validate_to_flag;
use iflowkit_core::types::TenantEnv;
use iflowkit_cpi::CpiClient;

use crate::classifier::{detect_changed_artifacts, partition_changed_keys};
use crate::compare::compare_folder_trees;
use crate::error::SyncError;
use crate::ignore::RepoIgnore;
use crate::transport::{
    build_transport_commit_message, new_transport_ids, TransportRecord, TransportStore,
    TransportType,
};

use super::apply::{apply_transport_to_tenant, ApplyCounts};
use super::bootstrap::ensure_env_branch_on_remote;
use super::{locate_repo, sample_paths, EngineContext, LogsFinalizer, RepoContext};

#[derive(Debug, Clone)]
pub struct DeliverOptions {
    pub to: TenantEnv,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DeliverOutcome {
    pub to: TenantEnv,
    pub source_branch: String,
    pub target_branch: String,
    pub transport_id: String,
    pub deleted: usize,
    pub updated: usize,
    pub deployed: usize,
}

pub fn run(
    ctx: &EngineContext,
    cwd: &Path,
    opts: &DeliverOptions,
) -> Result<DeliverOutcome, SyncError> {
    if opts.to == TenantEnv::Dev {
        return Err(SyncError::DeliverTargetRequired);
    }
    // For deliver, `--to prd` itself is the PRD confirmation.
    if opts.to == TenantEnv::Prd {
        validate_to_flag(Some(TenantEnv::Prd), TenantEnv::Prd)?;
    }

    let repo = locate_repo(cwd)?;
    let levels = repo.meta.cpi_tenant_levels;
    if opts.to == TenantEnv::Qas && levels != 3 {
        return Err(SyncError::QasNotEnabled {
            operation: "deliver",
            levels,
        });
    }
    if opts.to == TenantEnv::Prd && levels != 2 && levels != 3 {
        return Err(iflowkit_core::CoreError::InvalidTenantLevels { levels }.into());
    }

    // Promotion path.
    let source_branch = if opts.to == TenantEnv::Prd && levels == 3 {
        "qas"
    } else {
        "dev"
    };
    let target_branch = opts.to.as_str();

    tracing::info!(
        repo = %repo.repo_root.display(),
        to = %opts.to,
        from = source_branch,
        package_id = %repo.meta.package_id,
        "sync deliver started"
    );

    let original_branch = repo.git.current_branch().ok();

    // A dirty tree would contaminate the merge.
    let dirty = repo.git.porcelain_paths();
    if !dirty.is_empty() {
        return Err(SyncError::DirtyWorkingTree { count: dirty.len() });
    }

    let mut finalizer = LogsFinalizer::new(
        repo.git.clone(),
        TransportType::Deliver,
        &opts.message,
        target_branch,
        &repo.content_folder,
    );
    finalizer.tag_branch = Some(target_branch.to_string());

    let result = run_inner(
        ctx,
        &repo,
        opts,
        source_branch,
        target_branch,
        &mut finalizer,
    );
    let result = finalizer.finish(result);

    // Return the user to where they started, best-effort.
    if let Some(branch) = original_branch {
        let _ = repo.git.run(&["checkout", &branch]);
    }
    result
}

fn run_inner(
    ctx: &EngineContext,
    repo: &RepoContext,
    opts: &DeliverOptions,
    source_branch: &str,
    target_branch: &str,
    finalizer: &mut LogsFinalizer,
) -> Result<DeliverOutcome, SyncError> {
    let git = &repo.git;
    let levels = repo.meta.cpi_tenant_levels;
    let (profile_id, _) = ctx.resolve_profile()?;

    let ignore = RepoIgnore::load(&repo.repo_root)?;

    // Ensure the env branches this promotion touches exist on origin.
    if levels == 3 && (opts.to == TenantEnv::Qas || source_branch == "qas") {
        ensure_env_branch_on_remote(ctx, repo, &profile_id, TenantEnv::Qas)?;
    }
    if opts.to == TenantEnv::Prd {
        ensure_env_branch_on_remote(ctx, repo, &profile_id, TenantEnv::Prd)?;
    }

    // Refresh both ends of the promotion.
    git.ensure_branch_fetched_and_checked_out(source_branch)?;
    git.ensure_branch_fetched_and_checked_out(target_branch)?;

    let store = TransportStore::new(&repo.repo_root, opts.to);
    let pending = store.load_latest_pending(
        Some(&repo.meta.package_id),
        Some(target_branch),
        Some(TransportType::Deliver),
    )?;

    let mut rec = match pending {
        Some((rec, pending_path)) => {
            finalizer.transport_id = Some(rec.transport_id.clone());
            tracing::info!(
                transport_id = %rec.transport_id,
                record = %pending_path.display(),
                "resuming pending deliver transport"
            );
            git.ensure_branch_fetched_and_checked_out(target_branch)?;
            rec
        }
        None => {
            // Preflight: the target tenant must match the target branch.
            git.ensure_branch_fetched_and_checked_out(target_branch)?;
            let diff_paths = compare_tenant_with_current_branch(ctx, repo, &profile_id, opts.to, &ignore)?;
            if !diff_paths.is_empty() {
                return Err(SyncError::TenantBranchMismatch {
                    tenant: opts.to.display_upper().to_string(),
                    branch: target_branch.to_string(),
                    diffs: sample_paths(&diff_paths, 10).join(", "),
                });
            }

            // New transport id so the merge commit carries the strict format.
            let (transport_id, created_at) = new_transport_ids(Utc::now());

            git.ensure_branch_fetched_and_checked_out(source_branch)?;
            git.ensure_branch_fetched_and_checked_out(target_branch)?;
            let pre_merge = git.rev_parse("HEAD")?;

            let merge_msg = build_transport_commit_message(
                &transport_id,
                TransportType::Deliver,
                "contents",
                &opts.message,
            );
            tracing::info!(
                from = source_branch,
                to = target_branch,
                transport_id = %transport_id,
                "merging branches"
            );
            git.merge_no_ff(&merge_msg, source_branch)?;

            // Changed artifact set from the merge's content-folder diff.
            let range = format!("{pre_merge}..HEAD");
            let changed_paths = git
                .diff_name_only(&range, Some(&repo.content_folder))
                .unwrap_or_default();
            let changed_paths = ignore.filter(&changed_paths);
            let keys_changed = detect_changed_artifacts(&repo.content_folder, &changed_paths);
            let (to_upload, to_delete) =
                partition_changed_keys(&repo.repo_root, &repo.content_folder, &keys_changed);

            git.fetch_origin_branch(target_branch);
            let commits_to_push = git.commits_to_push(target_branch);
            let (git_user_name, git_user_email) = git.user_identity();

            let mut rec = TransportRecord::new(
                &transport_id,
                TransportType::Deliver,
                &repo.meta.package_id,
                target_branch,
                &created_at,
            );
            rec.git_commits = commits_to_push;
            rec.git_user_name = git_user_name;
            rec.git_user_email = git_user_email;
            rec.objects = to_upload.iter().cloned().collect();
            rec.deleted_objects = to_delete.iter().cloned().collect();
            rec.upload_remaining = to_upload.into_iter().collect();
            rec.delete_remaining = to_delete.into_iter().collect();

            // Persist the plan before any CPI side effect.
            let record_path = store.persist(&rec)?;
            finalizer.transport_id = Some(transport_id);
            tracing::info!(
                record = %record_path.display(),
                upload = rec.upload_remaining.len(),
                delete = rec.delete_remaining.len(),
                "deliver transport record created"
            );

            if let Err(err) = git.push(target_branch, false) {
                rec.mark_failed(err.to_string());
                let _ = store.persist(&rec);
                return Err(err.into());
            }
            rec
        }
    };

    // CPI phase against the target tenant.
    let mut client = ctx.cpi_client(&profile_id, opts.to)?;
    let ApplyCounts {
        deleted,
        updated,
        deployed,
    } = apply_transport_to_tenant(&mut client, &repo.repo_root, &repo.meta, &mut rec, &store)?;

    store.persist(&rec)?;

    tracing::info!(
        to = %opts.to,
        from = source_branch,
        branch = target_branch,
        transport_id = %rec.transport_id,
        deleted_artifacts = deleted,
        updated_artifacts = updated,
        deployed_artifacts = deployed,
        "sync deliver completed"
    );
    Ok(DeliverOutcome {
        to: opts.to,
        source_branch: source_branch.to_string(),
        target_branch: target_branch.to_string(),
        transport_id: rec.transport_id.clone(),
        deleted,
        updated,
        deployed,
    })
}

/// Export the tenant into a temp dir and hash-compare it against the
/// current checkout's content folder. Assumes the target branch is
/// checked out. Returns the differing repo-relative paths.
fn compare_tenant_with_current_branch(
    ctx: &EngineContext,
    repo: &RepoContext,
    profile_id: &str,
    env: TenantEnv,
    ignore: &RepoIgnore,
) -> Result<Vec<String>, SyncError> {
    let branch_base = repo.repo_root.join(&repo.content_folder);
    if !branch_base.exists() {
        // A missing content folder counts as a full diff.
        return Ok(vec![repo.content_folder.clone()]);
    }

    let tmp = tempfile::Builder::new()
        .prefix("iflowkit-compare-")
        .tempdir()
        .map_err(|e| crate::error::io_err(std::env::temp_dir(), e))?;

    let tenant_key = ctx.tenant_key(profile_id, env)?;
    let mut client = CpiClient::new(&tenant_key);
    let (_, raw) = client.read_integration_package(&repo.meta.package_id)?;
    let tenant_base = tmp.path().join(&repo.content_folder);
    client.export_integration_package_from_raw(&repo.meta.package_id, &raw, &tenant_base)?;

    compare_folder_trees(&repo.content_folder, &tenant_base, &branch_base, ignore)
}
