//! Env-branch bootstrap: create `origin/<env>` from the tenant's current
//! state when a promotion targets a branch that does not exist yet.

use chrono::Utc;

use iflowkit_core::fsio::ensure_dir;
use iflowkit_core::types::TenantEnv;
use iflowkit_cpi::CpiClient;
use iflowkit_git::GitTagger;

use crate::error::{io_err, SyncError};
use crate::transport::{build_transport_commit_message, new_transport_ids, TransportType};

use super::{write_init_transport, EngineContext, RepoContext};

/// Guarantee that `origin/<env>` exists, bootstrapping it from the
/// tenant's exported state when missing.
pub(crate) fn ensure_env_branch_on_remote(
    ctx: &EngineContext,
    repo: &RepoContext,
    profile_id: &str,
    env: TenantEnv,
) -> Result<(), SyncError> {
    repo.git.fetch_origin();
    if repo.git.remote_branch_exists(env.as_str()) {
        // Ensure the local branch exists and is up to date.
        repo.git.ensure_branch_fetched_and_checked_out(env.as_str())?;
        return Ok(());
    }
    tracing::info!(env = %env, "bootstrapping missing environment branch from tenant");
    bootstrap_env_branch_from_tenant(ctx, repo, profile_id, env)?;
    Ok(())
}

/// Create (or overwrite) a local `<env>` branch from the tenant export and
/// push it to origin with an init transport record and tag.
///
/// Returns the created transport id.
pub(crate) fn bootstrap_env_branch_from_tenant(
    ctx: &EngineContext,
    repo: &RepoContext,
    profile_id: &str,
    env: TenantEnv,
) -> Result<String, SyncError> {
    let git = &repo.git;
    let branch = env.as_str();

    let tenant_key = ctx.tenant_key(profile_id, env)?;

    // Start from dev so the env branches share history.
    git.ensure_branch_fetched_and_checked_out("dev")?;
    git.run(&["checkout", "-B", branch, "dev"])?;

    // Export the tenant state over the content folder.
    let mut client = CpiClient::new(&tenant_key);
    let (_, raw) = client.read_integration_package(&repo.meta.package_id)?;
    let base_abs = repo.repo_root.join(&repo.content_folder);
    match std::fs::remove_dir_all(&base_abs) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&base_abs, e)),
    }
    ensure_dir(&base_abs)?;
    client.export_integration_package_from_raw(&repo.meta.package_id, &raw, &base_abs)?;

    let (transport_id, created_at) = new_transport_ids(Utc::now());
    write_init_transport(
        &repo.repo_root,
        &repo.meta.base_folder,
        &repo.meta.package_id,
        env,
        branch,
        &transport_id,
        &created_at,
    )?;

    // Contents commit, branch push, logs commit, tag.
    let contents_msg = build_transport_commit_message(
        &transport_id,
        TransportType::Init,
        "contents",
        "bootstrap",
    );
    git.commit_pathspec(&contents_msg, &repo.content_folder)?;
    git.push(branch, true)?;

    let logs_msg =
        build_transport_commit_message(&transport_id, TransportType::Init, "logs", "bootstrap");
    git.commit_and_push_logs(branch, &repo.content_folder, &logs_msg)?;

    GitTagger::new(git).tag_branch_with_transport_id(branch, &transport_id)?;

    tracing::info!(env = %env, branch, transport_id = %transport_id, "environment branch bootstrapped");
    Ok(transport_id)
}
