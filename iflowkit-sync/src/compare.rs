//! Folder tree comparison by per-file SHA-256.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, SyncError};
use crate::ignore::RepoIgnore;

/// Compare the file contents of two directory trees.
///
/// Returned paths are repo-relative (slash-separated) and prefixed with
/// `repo_rel_prefix`; ignore rules apply to those prefixed paths. A path is
/// reported when its hash differs or it exists in exactly one tree.
/// Missing roots are treated as empty.
pub fn compare_folder_trees(
    repo_rel_prefix: &str,
    abs_a: &Path,
    abs_b: &Path,
    ignore: &RepoIgnore,
) -> Result<Vec<String>, SyncError> {
    let prefix = repo_rel_prefix.trim().trim_matches('/');
    let hashes_a = hash_dir(prefix, abs_a, ignore)?;
    let hashes_b = hash_dir(prefix, abs_b, ignore)?;

    let mut diff: Vec<String> = Vec::new();
    for (path, hash) in &hashes_a {
        if hashes_b.get(path) != Some(hash) {
            diff.push(path.clone());
        }
    }
    for path in hashes_b.keys() {
        if !hashes_a.contains_key(path) {
            diff.push(path.clone());
        }
    }
    diff.sort();
    diff.dedup();
    Ok(diff)
}

fn hash_dir(
    prefix: &str,
    abs_root: &Path,
    ignore: &RepoIgnore,
) -> Result<BTreeMap<String, String>, SyncError> {
    let mut hashes = BTreeMap::new();
    match std::fs::metadata(abs_root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(io_err(
                abs_root,
                std::io::Error::other("not a directory"),
            ))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(hashes),
        Err(e) => return Err(io_err(abs_root, e)),
    }

    for entry in walkdir::WalkDir::new(abs_root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(abs_root).to_path_buf();
            io_err(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(abs_root)
            .expect("walked path is under the root")
            .to_string_lossy()
            .replace('\\', "/");
        let repo_rel = if prefix.is_empty() {
            rel
        } else {
            format!("{prefix}/{rel}")
        };
        if ignore.is_ignored(&repo_rel) {
            continue;
        }
        hashes.insert(repo_rel, sha256_file(entry.path())?);
    }
    Ok(hashes)
}

fn sha256_file(path: &Path) -> Result<String, SyncError> {
    let mut file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| io_err(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_ignore() -> RepoIgnore {
        RepoIgnore::from_patterns(&[]).unwrap()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn identical_trees_produce_no_diff() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        for root in [a.path(), b.path()] {
            write(root, "iFlows/Flow_A/flow.iflw", "<bpmn2/>");
            write(root, "IntegrationPackage.json", "{}");
        }
        let diff =
            compare_folder_trees("IntegrationPackage", a.path(), b.path(), &no_ignore()).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn reports_changed_missing_and_extra_files() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write(a.path(), "x.txt", "one");
        write(b.path(), "x.txt", "two");
        write(a.path(), "only_in_a.txt", "a");
        write(b.path(), "only_in_b.txt", "b");

        let diff =
            compare_folder_trees("IntegrationPackage", a.path(), b.path(), &no_ignore()).unwrap();
        assert_eq!(
            diff,
            vec![
                "IntegrationPackage/only_in_a.txt",
                "IntegrationPackage/only_in_b.txt",
                "IntegrationPackage/x.txt",
            ]
        );
    }

    #[test]
    fn ignored_paths_do_not_count_as_drift() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write(a.path(), "iFlows/F/metainfo.prop", "ts=1");
        write(b.path(), "iFlows/F/metainfo.prop", "ts=2");

        let ign =
            RepoIgnore::from_patterns(&["IntegrationPackage/**/metainfo.prop"]).unwrap();
        let diff = compare_folder_trees("IntegrationPackage", a.path(), b.path(), &ign).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn missing_root_counts_as_empty() {
        let a = TempDir::new().unwrap();
        write(a.path(), "f.txt", "data");
        let missing = a.path().join("does-not-exist");

        let diff =
            compare_folder_trees("IntegrationPackage", a.path(), &missing, &no_ignore()).unwrap();
        assert_eq!(diff, vec!["IntegrationPackage/f.txt"]);
    }
}
