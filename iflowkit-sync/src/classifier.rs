//! Artifact classification: changed file paths → `(kind, id)` keys, and
//! partitioning into upload/delete sets by local folder existence.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use iflowkit_core::types::{ArtifactKey, ArtifactKind};

use crate::error::{io_err, SyncError};

/// Identify artifacts affected by changed repo-relative paths.
///
/// Expected layout: `<contentFolder>/<Kind>/<ArtifactId>/<file>` — paths
/// with fewer than three segments after the content folder, unknown kinds,
/// and list JSON files directly under a kind folder contribute nothing.
pub fn detect_changed_artifacts(
    content_folder: &str,
    changed_paths: &[String],
) -> BTreeSet<ArtifactKey> {
    let base = format!("{}/", content_folder.trim_matches('/'));
    let mut keys = BTreeSet::new();

    for path in changed_paths {
        let norm = path.trim().replace('\\', "/");
        let Some(rel) = norm.strip_prefix(&base) else {
            continue;
        };
        let mut segments = rel.splitn(3, '/');
        let (Some(kind), Some(id), Some(_rest)) =
            (segments.next(), segments.next(), segments.next())
        else {
            continue;
        };
        let id = id.trim();
        let Some(kind) = ArtifactKind::from_folder(kind.trim()) else {
            continue;
        };
        // List files directly under a kind folder look like ids with ".json".
        if id.is_empty() || id.contains(".json") {
            continue;
        }
        keys.insert(ArtifactKey::new(kind, id));
    }
    keys
}

/// Split changed keys into `(to_upload, to_delete)` by local folder
/// existence. A key whose directory is missing becomes a delete only when
/// its kind is deletable; otherwise it is dropped.
pub fn partition_changed_keys(
    repo_root: &Path,
    content_folder: &str,
    changed: &BTreeSet<ArtifactKey>,
) -> (BTreeSet<ArtifactKey>, BTreeSet<ArtifactKey>) {
    let mut to_upload = BTreeSet::new();
    let mut to_delete = BTreeSet::new();

    for key in changed {
        let dir = repo_root
            .join(content_folder)
            .join(key.kind.folder_name())
            .join(&key.id);
        if dir.is_dir() {
            to_upload.insert(key.clone());
        } else if key.kind.is_deletable() {
            to_delete.insert(key.clone());
        }
    }
    (to_upload, to_delete)
}

/// All locally present artifacts under `<contentFolder>/<Kind>/<Id>/`.
///
/// Only directories count; hidden folders and list JSON files are skipped.
pub fn list_local_artifact_keys(repo_root: &Path, content_folder: &str) -> BTreeSet<ArtifactKey> {
    let base = repo_root.join(content_folder);
    let mut keys = BTreeSet::new();

    for kind in ArtifactKind::ALL {
        let kind_dir = base.join(kind.folder_name());
        let Ok(entries) = std::fs::read_dir(&kind_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().trim().to_string();
            if id.is_empty() || id.starts_with('.') {
                continue;
            }
            keys.insert(ArtifactKey::new(kind, id));
        }
    }
    keys
}

/// Full object inventory for an init transport: directory scan merged with
/// the ids found in the exported list JSON files.
///
/// The list JSON pass captures objects without a media export, e.g.
/// CustomTags that only exist as entries of `CustomTags.json`.
pub fn collect_all_objects_from_export(
    repo_root: &Path,
    base_folder: &str,
) -> Result<Vec<ArtifactKey>, SyncError> {
    let base_folder = if base_folder.trim().is_empty() {
        "IntegrationPackage"
    } else {
        base_folder.trim()
    };
    let base = repo_root.join(base_folder);
    let mut keys = BTreeSet::new();

    for kind in ArtifactKind::ALL {
        let kind_dir = base.join(kind.folder_name());
        let entries = match std::fs::read_dir(&kind_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(io_err(&kind_dir, e)),
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().trim().to_string();
            if name.is_empty() || name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                keys.insert(ArtifactKey::new(kind, name));
            } else if name.to_ascii_lowercase().ends_with(".json") {
                for id in parse_list_ids(&entry.path()) {
                    keys.insert(ArtifactKey::new(kind, id));
                }
            }
        }
    }
    Ok(keys.into_iter().collect())
}

/// Best-effort parse of a CPI OData list JSON for artifact ids.
fn parse_list_ids(path: &Path) -> Vec<String> {
    #[derive(Deserialize)]
    struct ListResponse {
        d: ListBody,
    }
    #[derive(Deserialize)]
    struct ListBody {
        #[serde(default)]
        results: Vec<ListItem>,
    }
    #[derive(Deserialize)]
    struct ListItem {
        #[serde(rename = "Id", default)]
        id: String,
    }

    let Ok(raw) = std::fs::read(path) else {
        return Vec::new();
    };
    let Ok(parsed) = serde_json::from_slice::<ListResponse>(&raw) else {
        return Vec::new();
    };
    parsed
        .d
        .results
        .into_iter()
        .map(|it| it.id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_kind_and_id_from_paths() {
        let keys = detect_changed_artifacts(
            "IntegrationPackage",
            &strings(&[
                "IntegrationPackage/iFlows/Order_Create/src/main/resources/flow.iflw",
                "IntegrationPackage/Scripts/Utils/script.groovy",
                "IntegrationPackage/iFlows/Order_Create/manifest.mf",
            ]),
        );
        let expected: BTreeSet<ArtifactKey> = [
            ArtifactKey::new(ArtifactKind::IFlows, "Order_Create"),
            ArtifactKey::new(ArtifactKind::Scripts, "Utils"),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn ignores_list_files_unknown_kinds_and_shallow_paths() {
        let keys = detect_changed_artifacts(
            "IntegrationPackage",
            &strings(&[
                "IntegrationPackage/iFlows/IntegrationDesigntimeArtifacts.json/x",
                "IntegrationPackage/Unknown/Thing/file",
                "IntegrationPackage/iFlows/OnlyTwoSegments",
                "IntegrationPackage/IntegrationPackage.json",
                "README.md",
                "",
            ]),
        );
        assert!(keys.is_empty());
    }

    #[test]
    fn respects_custom_content_folder() {
        let keys = detect_changed_artifacts(
            "Custom",
            &strings(&[
                "Custom/ValueMappings/VM_1/value_mapping.xml",
                "IntegrationPackage/iFlows/X/file",
            ]),
        );
        assert_eq!(keys.len(), 1);
        assert_eq!(
            keys.iter().next().unwrap(),
            &ArtifactKey::new(ArtifactKind::ValueMappings, "VM_1")
        );
    }

    #[test]
    fn partition_by_local_folder_existence() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(
            tmp.path()
                .join("IntegrationPackage/iFlows/Existing_Flow/src"),
        )
        .unwrap();

        let changed: BTreeSet<ArtifactKey> = [
            ArtifactKey::new(ArtifactKind::IFlows, "Existing_Flow"),
            ArtifactKey::new(ArtifactKind::IFlows, "Removed_Flow"),
            ArtifactKey::new(ArtifactKind::CustomTags, "SomeTag"),
        ]
        .into_iter()
        .collect();

        let (upload, delete) = partition_changed_keys(tmp.path(), "IntegrationPackage", &changed);
        assert_eq!(
            upload.into_iter().collect::<Vec<_>>(),
            vec![ArtifactKey::new(ArtifactKind::IFlows, "Existing_Flow")]
        );
        // CustomTags is not deletable, so the missing tag folder is dropped.
        assert_eq!(
            delete.into_iter().collect::<Vec<_>>(),
            vec![ArtifactKey::new(ArtifactKind::IFlows, "Removed_Flow")]
        );
    }

    #[test]
    fn local_inventory_skips_files_and_hidden_dirs() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("IntegrationPackage");
        fs::create_dir_all(base.join("iFlows/Flow_A")).unwrap();
        fs::create_dir_all(base.join("iFlows/.hidden")).unwrap();
        fs::create_dir_all(base.join("Scripts/Utils")).unwrap();
        fs::write(base.join("iFlows/IntegrationDesigntimeArtifacts.json"), "{}").unwrap();

        let keys = list_local_artifact_keys(tmp.path(), "IntegrationPackage");
        let expected: BTreeSet<ArtifactKey> = [
            ArtifactKey::new(ArtifactKind::IFlows, "Flow_A"),
            ArtifactKey::new(ArtifactKind::Scripts, "Utils"),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
    }

    #[test]
    fn init_inventory_merges_folders_and_list_json() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("IntegrationPackage");
        fs::create_dir_all(base.join("iFlows/Flow_A")).unwrap();
        fs::create_dir_all(base.join("CustomTags")).unwrap();
        fs::write(
            base.join("CustomTags/CustomTags.json"),
            r#"{"d":{"results":[{"Id":"Owner"},{"Id":"CostCenter"},{"Id":""}]}}"#,
        )
        .unwrap();

        let objects = collect_all_objects_from_export(tmp.path(), "IntegrationPackage").unwrap();
        assert_eq!(
            objects,
            vec![
                ArtifactKey::new(ArtifactKind::CustomTags, "CostCenter"),
                ArtifactKey::new(ArtifactKind::CustomTags, "Owner"),
                ArtifactKey::new(ArtifactKind::IFlows, "Flow_A"),
            ]
        );
    }

    #[test]
    fn init_inventory_tolerates_malformed_list_json() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("IntegrationPackage");
        fs::create_dir_all(base.join("Scripts")).unwrap();
        fs::write(base.join("Scripts/Whatever.json"), "not json").unwrap();

        let objects = collect_all_objects_from_export(tmp.path(), "IntegrationPackage").unwrap();
        assert!(objects.is_empty());
    }
}
