//! Repo locator and sync metadata (`.iflowkit/package.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

/// Directory marker that identifies a sync repository root.
pub const MARKER_DIR: &str = ".iflowkit";

/// Default content folder when `baseFolder` is blank.
pub const DEFAULT_BASE_FOLDER: &str = "IntegrationPackage";

/// Immutable sync metadata written once by `sync init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    pub schema_version: u32,
    pub profile_id: String,
    pub cpi_tenant_levels: u8,
    pub package_id: String,
    pub package_name: String,
    pub base_folder: String,
    pub git_remote: String,
    pub git_provider: String,
    pub created_at: String,
}

impl SyncMetadata {
    /// Reject metadata with any missing required field.
    pub fn validate_required(&self) -> Result<(), CoreError> {
        let file = "sync metadata".to_string();
        let missing = |field| CoreError::MissingField {
            file: file.clone(),
            field,
        };
        if self.schema_version == 0 {
            return Err(missing("schemaVersion"));
        }
        if self.profile_id.is_empty() {
            return Err(missing("profileId"));
        }
        if self.cpi_tenant_levels == 0 {
            return Err(missing("cpiTenantLevels"));
        }
        if self.package_id.is_empty() {
            return Err(missing("packageId"));
        }
        if self.package_name.is_empty() {
            return Err(missing("packageName"));
        }
        if self.base_folder.is_empty() {
            return Err(missing("baseFolder"));
        }
        if self.git_remote.is_empty() {
            return Err(missing("gitRemote"));
        }
        if self.git_provider.is_empty() {
            return Err(missing("gitProvider"));
        }
        if self.created_at.is_empty() {
            return Err(missing("createdAt"));
        }
        Ok(())
    }

    /// The repo-relative content folder, defaulting when blank.
    pub fn content_folder(&self) -> String {
        let trimmed = self.base_folder.trim().trim_matches('/');
        if trimmed.is_empty() {
            DEFAULT_BASE_FOLDER.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Walk upward from `start` to the first directory containing `.iflowkit/`.
pub fn find_repo_root(start: &Path) -> Result<PathBuf, CoreError> {
    let mut current = start;
    loop {
        if current.join(MARKER_DIR).is_dir() {
            return Ok(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return Err(CoreError::RepoNotFound),
        }
    }
}

/// Path of the metadata file inside a repo.
pub fn metadata_path(repo_root: &Path) -> PathBuf {
    repo_root.join(MARKER_DIR).join("package.json")
}

/// Load and validate `.iflowkit/package.json`.
pub fn load_metadata(repo_root: &Path) -> Result<SyncMetadata, CoreError> {
    let path = metadata_path(repo_root);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let meta: SyncMetadata =
        serde_json::from_str(&contents).map_err(|e| CoreError::Json { path, source: e })?;
    Ok(meta)
}
