//! The CPI phase shared by push and deliver: delete → upload → deploy,
//! checkpointing the transport record after every unit of work.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use iflowkit_core::archive::zip_dir_to_bytes;
use iflowkit_core::metadata::SyncMetadata;
use iflowkit_core::types::{ArtifactKey, ArtifactKind};
use iflowkit_cpi::{ArtifactInfo, CpiClient};

use crate::error::SyncError;
use crate::transport::{merge_keys, remove_key, TransportRecord, TransportStore};

use super::persist_checkpoint;

/// Mutation counts of one CPI phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    pub deleted: usize,
    pub updated: usize,
    pub deployed: usize,
}

/// Execute the record's outstanding delete/upload/deploy work against the
/// tenant behind `client`.
///
/// Entries run in `(kind, id)` order within each phase. Every success
/// removes its entry from the matching `*Remaining` list and re-persists
/// the record; the first CPI error is stored on the record (status back to
/// `pending`) and surfaced, leaving the run resumable.
pub fn apply_transport_to_tenant(
    client: &mut CpiClient,
    repo_root: &Path,
    meta: &SyncMetadata,
    rec: &mut TransportRecord,
    store: &TransportStore,
) -> Result<ApplyCounts, SyncError> {
    let session = client.fetch_csrf_token()?;
    let mut counts = ApplyCounts::default();
    let content_folder = meta.content_folder();

    // 1) Deletes first, so renames do not collide with uploads.
    let mut ordered_delete = rec.delete_remaining.clone();
    ordered_delete.sort();
    for key in ordered_delete {
        tracing::info!(kind = %key.kind, id = %key.id, version = "active", "deleting artifact from CPI");
        if let Err(err) = client.delete_artifact_by_kind(key.kind, &key.id, &session) {
            rec.mark_failed(err.to_string());
            persist_checkpoint(store, rec);
            return Err(err.into());
        }
        counts.deleted += 1;
        remove_key(&mut rec.delete_remaining, &key);
        persist_checkpoint(store, rec);
    }

    // 2) Fetch each kind's CPI list once, then upload.
    let kinds: BTreeSet<ArtifactKind> = rec.upload_remaining.iter().map(|k| k.kind).collect();
    let mut artifacts_by_kind: HashMap<ArtifactKind, HashMap<String, ArtifactInfo>> =
        HashMap::new();
    for kind in kinds {
        let endpoint = CpiClient::list_endpoint_for_kind(&meta.package_id, kind);
        match client.list_artifacts(&endpoint) {
            Ok(map) => {
                artifacts_by_kind.insert(kind, map);
            }
            Err(err) => {
                rec.mark_failed(err.to_string());
                persist_checkpoint(store, rec);
                return Err(err.into());
            }
        }
    }

    let mut ordered_upload = rec.upload_remaining.clone();
    ordered_upload.sort();
    for key in ordered_upload {
        let info = artifacts_by_kind
            .get(&key.kind)
            .and_then(|m| m.get(&key.id))
            .cloned();
        let Some(info) = info else {
            tracing::warn!(kind = %key.kind, id = %key.id, "artifact not found in CPI list; skipping");
            remove_key(&mut rec.upload_remaining, &key);
            persist_checkpoint(store, rec);
            continue;
        };

        let artifact_dir = repo_root
            .join(&content_folder)
            .join(key.kind.folder_name())
            .join(&key.id);
        if !artifact_dir.is_dir() {
            tracing::warn!(
                dir = %artifact_dir.display(),
                kind = %key.kind,
                id = %key.id,
                "artifact directory missing; skipping"
            );
            remove_key(&mut rec.upload_remaining, &key);
            persist_checkpoint(store, rec);
            continue;
        }

        let zip_bytes = match zip_dir_to_bytes(&artifact_dir) {
            Ok(bytes) => bytes,
            Err(err) => {
                rec.mark_failed(err.to_string());
                persist_checkpoint(store, rec);
                return Err(err.into());
            }
        };

        let Some(entity_set) = key.kind.entity_set() else {
            tracing::warn!(kind = %key.kind, id = %key.id, "artifact kind is not supported for CPI updates; skipping");
            remove_key(&mut rec.upload_remaining, &key);
            persist_checkpoint(store, rec);
            continue;
        };

        tracing::info!(kind = %key.kind, id = %key.id, "uploading artifact to CPI");
        if let Err(err) = client.update_artifact(entity_set, &info, &zip_bytes, &session) {
            rec.mark_failed(err.to_string());
            persist_checkpoint(store, rec);
            return Err(err.into());
        }
        counts.updated += 1;
        remove_key(&mut rec.upload_remaining, &key);
        if key.kind.requires_deploy() {
            rec.deploy_remaining = merge_keys(&rec.deploy_remaining, [key.clone()]);
        }
        persist_checkpoint(store, rec);
    }

    // 3) Deploy what was uploaded (or previously left pending).
    let mut ordered_deploy = rec.deploy_remaining.clone();
    ordered_deploy.sort();
    for key in ordered_deploy {
        if key.kind.deploy_endpoint().is_none() {
            tracing::warn!(kind = %key.kind, id = %key.id, "deploy kind not supported; skipping");
            remove_key(&mut rec.deploy_remaining, &key);
            persist_checkpoint(store, rec);
            continue;
        }
        tracing::info!(kind = %key.kind, id = %key.id, version = "active", "deploying artifact");
        if let Err(err) = client.deploy_artifact(key.kind, &key.id, &session) {
            rec.mark_failed(err.to_string());
            persist_checkpoint(store, rec);
            return Err(err.into());
        }
        counts.deployed += 1;
        remove_key(&mut rec.deploy_remaining, &key);
        persist_checkpoint(store, rec);
        tracing::info!(kind = %key.kind, id = %key.id, version = "active", "artifact deployed");
    }

    rec.mark_completed();
    store.persist(rec)?;
    Ok(counts)
}

// Ordering sanity for the phase loops lives here; the CPI calls themselves
// are covered by the client tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_order_is_kind_then_id_across_phases() {
        let mut keys = vec![
            ArtifactKey::new(ArtifactKind::IFlows, "Zeta"),
            ArtifactKey::new(ArtifactKind::Scripts, "Alpha"),
            ArtifactKey::new(ArtifactKind::IFlows, "Alpha"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ArtifactKey::new(ArtifactKind::Scripts, "Alpha"),
                ArtifactKey::new(ArtifactKind::IFlows, "Alpha"),
                ArtifactKey::new(ArtifactKind::IFlows, "Zeta"),
            ]
        );
    }
}
