//! The transport engine: init / pull / push / deliver / compare /
//! deploy-status flows.
//!
//! All flows share a skeleton: locate repo and metadata, resolve the
//! branch → tenant route, run a git preflight, plan or resume a transport
//! record, execute delete → upload → deploy with checkpointing, then (via
//! [`LogsFinalizer`]) commit the `.iflowkit` state and tag on success.

pub mod apply;
pub mod compare_branch;
pub mod deliver;
pub mod deploy_status;
pub mod init;
pub mod pull;
pub mod push;

mod bootstrap;

use std::path::{Path, PathBuf};

use iflowkit_core::metadata::{find_repo_root, load_metadata, SyncMetadata};
use iflowkit_core::profile::{Profile, TenantServiceKey};
use iflowkit_core::store::{read_profile, read_tenant_key, resolve_profile_id, Paths};
use iflowkit_core::types::TenantEnv;
use iflowkit_cpi::CpiClient;
use iflowkit_git::{GitDriver, GitTagger};

use crate::classifier::collect_all_objects_from_export;
use crate::error::SyncError;
use crate::transport::{
    build_transport_commit_message, TransportRecord, TransportStore, TransportType,
};

/// Shared wiring for one engine invocation: where the config store lives
/// and which profile the user selected.
#[derive(Debug, Clone)]
pub struct EngineContext {
    pub paths: Paths,
    pub profile: Option<String>,
}

impl EngineContext {
    pub fn new(paths: Paths, profile: Option<String>) -> EngineContext {
        EngineContext { paths, profile }
    }

    pub(crate) fn resolve_profile(&self) -> Result<(String, Profile), SyncError> {
        let profile_id = resolve_profile_id(&self.paths, self.profile.as_deref())?;
        let profile = read_profile(&self.paths, &profile_id)?;
        tracing::info!(profile = %profile_id, "resolved profile");
        Ok((profile_id, profile))
    }

    pub(crate) fn tenant_key(
        &self,
        profile_id: &str,
        env: TenantEnv,
    ) -> Result<TenantServiceKey, SyncError> {
        Ok(read_tenant_key(&self.paths, profile_id, env)?)
    }

    pub(crate) fn cpi_client(
        &self,
        profile_id: &str,
        env: TenantEnv,
    ) -> Result<CpiClient, SyncError> {
        let key = self.tenant_key(profile_id, env)?;
        Ok(CpiClient::new(&key))
    }
}

/// A located sync repository: root, validated metadata, content folder and
/// a git driver bound to the root.
pub(crate) struct RepoContext {
    pub repo_root: PathBuf,
    pub meta: SyncMetadata,
    pub content_folder: String,
    pub git: GitDriver,
}

pub(crate) fn locate_repo(cwd: &Path) -> Result<RepoContext, SyncError> {
    let repo_root = find_repo_root(cwd)?;
    let meta = load_metadata(&repo_root)?;
    meta.validate_required()?;
    let content_folder = meta.content_folder();
    let git = GitDriver::new(&repo_root);
    Ok(RepoContext {
        repo_root,
        meta,
        content_folder,
        git,
    })
}

/// Runs the deferred tail of a transport command: the `.iflowkit` logs
/// commit (always, once a transport was touched) and the transport tag
/// (only on success, only for env branches).
///
/// The logs commit runs even after a failed CPI phase so the record
/// reflecting the failure reaches the remote.
pub(crate) struct LogsFinalizer {
    git: GitDriver,
    transport_type: TransportType,
    message: String,
    branch: String,
    content_folder: String,
    /// Set once a transport record exists on disk for this run.
    pub transport_id: Option<String>,
    /// Set when a successful run should tag `<transportId>_<branch>`.
    pub tag_branch: Option<String>,
}

impl LogsFinalizer {
    pub(crate) fn new(
        git: GitDriver,
        transport_type: TransportType,
        message: &str,
        branch: &str,
        content_folder: &str,
    ) -> LogsFinalizer {
        LogsFinalizer {
            git,
            transport_type,
            message: message.to_string(),
            branch: branch.to_string(),
            content_folder: content_folder.to_string(),
            transport_id: None,
            tag_branch: None,
        }
    }

    pub(crate) fn finish<T>(self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        let Some(transport_id) = &self.transport_id else {
            return result;
        };

        let message = build_transport_commit_message(
            transport_id,
            self.transport_type,
            "logs",
            &self.message,
        );
        if let Err(logs_err) =
            self.git
                .commit_and_push_logs(&self.branch, &self.content_folder, &message)
        {
            match result {
                Ok(_) => return Err(logs_err.into()),
                Err(run_err) => {
                    tracing::warn!(error = %logs_err, "failed to push .iflowkit metadata");
                    return Err(run_err);
                }
            }
        }

        if result.is_ok() {
            if let Some(tag_branch) = &self.tag_branch {
                let tagger = GitTagger::new(&self.git);
                tagger.tag_branch_with_transport_id(tag_branch, transport_id)?;
            }
        }
        result
    }
}

/// Create an `init` transport record (always `completed`, full inventory)
/// under `.iflowkit/transports/<env>/`.
pub(crate) fn write_init_transport(
    repo_root: &Path,
    base_folder: &str,
    package_id: &str,
    env: TenantEnv,
    branch: &str,
    transport_id: &str,
    created_at: &str,
) -> Result<(), SyncError> {
    let objects = collect_all_objects_from_export(repo_root, base_folder)?;
    let mut rec = TransportRecord::new(
        transport_id,
        TransportType::Init,
        package_id,
        branch,
        created_at,
    );
    rec.objects = objects;
    rec.mark_completed();
    TransportStore::new(repo_root, env).persist(&rec)?;
    Ok(())
}

/// Best-effort checkpoint persistence between CPI steps; a failed write is
/// logged, not fatal, because the next successful step persists again.
pub(crate) fn persist_checkpoint(store: &TransportStore, rec: &TransportRecord) {
    if let Err(e) = store.persist(rec) {
        tracing::warn!(error = %e, transport_id = %rec.transport_id, "failed to persist transport checkpoint");
    }
}

/// Truncate a diff path list for error messages: first `max` entries plus
/// a `... (+N more)` suffix.
pub(crate) fn sample_paths(paths: &[String], max: usize) -> Vec<String> {
    if paths.len() <= max {
        return paths.to_vec();
    }
    let mut out: Vec<String> = paths[..max].to_vec();
    out.push(format!("... (+{} more)", paths.len() - max));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_paths_truncates_with_suffix() {
        let paths: Vec<String> = (0..13).map(|i| format!("p{i}")).collect();
        let sampled = sample_paths(&paths, 10);
        assert_eq!(sampled.len(), 11);
        assert_eq!(sampled[10], "... (+3 more)");

        let short: Vec<String> = vec!["a".into()];
        assert_eq!(sample_paths(&short, 10), short);
    }
}
