//! `sync deploy status` — runtime deployment status in CPI for the
//! objects of a transport record.

use std::path::Path;

use iflowkit_core::types::{ArtifactKind, TenantEnv};

use crate::error::SyncError;
use crate::transport::TransportStore;

use super::{locate_repo, EngineContext};

#[derive(Debug, Clone)]
pub struct DeployStatusOptions {
    pub env: TenantEnv,
    /// Explicit transport id; defaults to the latest record of the env.
    pub transport: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DeployStatusOutcome {
    NoRecords,
    NoObjects,
    Rows(Vec<DeployStatusRow>),
}

#[derive(Debug, Clone)]
pub struct DeployStatusRow {
    pub kind: ArtifactKind,
    pub id: String,
    pub status: String,
    pub deployed_on: String,
}

pub fn run(
    ctx: &EngineContext,
    cwd: &Path,
    opts: &DeployStatusOptions,
) -> Result<DeployStatusOutcome, SyncError> {
    let repo = locate_repo(cwd)?;
    let store = TransportStore::new(&repo.repo_root, opts.env);

    let rec = match &opts.transport {
        Some(transport_id) => store.load_record(transport_id.trim())?,
        None => match store.load_latest()? {
            Some((rec, _)) => rec,
            None => return Ok(DeployStatusOutcome::NoRecords),
        },
    };

    if rec.objects.is_empty() {
        return Ok(DeployStatusOutcome::NoObjects);
    }

    let (profile_id, _) = ctx.resolve_profile()?;
    let mut client = ctx.cpi_client(&profile_id, opts.env)?;

    let mut objects = rec.objects.clone();
    objects.sort();

    let mut rows = Vec::with_capacity(objects.len());
    for object in objects {
        let row = match client.get_integration_runtime_artifact(&object.id) {
            Ok(Some(runtime)) => DeployStatusRow {
                kind: object.kind,
                id: object.id,
                status: runtime.status,
                deployed_on: runtime.deployed_on,
            },
            Ok(None) => DeployStatusRow {
                kind: object.kind,
                id: object.id,
                status: "NOT_FOUND".to_string(),
                deployed_on: String::new(),
            },
            Err(err) => {
                tracing::warn!(id = %object.id, error = %err, "deployment status check failed");
                DeployStatusRow {
                    kind: object.kind,
                    id: object.id,
                    status: "ERROR".to_string(),
                    deployed_on: String::new(),
                }
            }
        };
        rows.push(row);
    }
    Ok(DeployStatusOutcome::Rows(rows))
}
