//! Zip packaging and zip-slip-safe extraction.

use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{io_err, CoreError};
use crate::fsio::{atomic_write_file, ensure_dir};

/// Zip the contents of `src_dir` (recursively) and return the archive bytes.
///
/// Entries are slash-separated paths relative to `src_dir` (no outer
/// folder). A fixed modification time keeps the output deterministic for
/// identical trees.
pub fn zip_dir_to_bytes(src_dir: &Path) -> Result<Vec<u8>, CoreError> {
    let buf = Cursor::new(Vec::new());
    let mut zw = ZipWriter::new(buf);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(src_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src_dir).to_path_buf();
            io_err(path, e.into())
        })?;
        if entry.file_type().is_file() {
            entries.push(entry.into_path());
        }
    }

    for path in entries {
        let rel = path
            .strip_prefix(src_dir)
            .expect("walked path is under the root");
        let name = slash_join(rel);
        if name.is_empty() {
            continue;
        }
        zw.start_file(&name, options)
            .map_err(|e| CoreError::Zip {
                path: path.clone(),
                source: e,
            })?;
        let data = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
        zw.write_all(&data).map_err(|e| io_err(&path, e))?;
    }

    let buf = zw.finish().map_err(|e| CoreError::Zip {
        path: src_dir.to_path_buf(),
        source: e,
    })?;
    Ok(buf.into_inner())
}

/// Extract a zip archive into `dest_dir`, rejecting unsafe entries.
///
/// An entry is unsafe when it contains `:`, is absolute, has `..`
/// components, or would resolve outside `dest_dir`. Extraction aborts
/// before writing anything for such archives.
pub fn extract_zip_bytes(data: &[u8], dest_dir: &Path) -> Result<(), CoreError> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(|e| CoreError::Zip {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    ensure_dir(dest_dir)?;

    // Validate every entry before the first write.
    let mut targets: Vec<(usize, Option<PathBuf>)> = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(|e| CoreError::Zip {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        let rel = safe_entry_path(entry.name())?;
        if entry.is_dir() {
            targets.push((index, None));
        } else {
            targets.push((index, Some(dest_dir.join(rel))));
        }
    }

    for (index, target) in targets {
        let mut entry = archive.by_index(index).map_err(|e| CoreError::Zip {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        match target {
            None => {
                let rel = safe_entry_path(entry.name())?;
                ensure_dir(&dest_dir.join(rel))?;
            }
            Some(target) => {
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| io_err(&target, e))?;
                atomic_write_file(&target, &data)?;
            }
        }
    }
    Ok(())
}

/// Extract a zip file on disk into `dest_dir`.
pub fn extract_zip_file(zip_path: &Path, dest_dir: &Path) -> Result<(), CoreError> {
    let data = std::fs::read(zip_path).map_err(|e| io_err(zip_path, e))?;
    extract_zip_bytes(&data, dest_dir)
}

/// Reject entry names that could escape the extraction root.
fn safe_entry_path(name: &str) -> Result<PathBuf, CoreError> {
    let unsafe_entry = || CoreError::UnsafeZipEntry {
        entry: name.to_string(),
    };

    if name.contains(':') {
        return Err(unsafe_entry());
    }
    let normalized = name.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(unsafe_entry()),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(unsafe_entry());
    }
    Ok(out)
}

fn slash_join(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let buf = Cursor::new(Vec::new());
        let mut zw = ZipWriter::new(buf);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in entries {
            zw.start_file(*name, options).unwrap();
            zw.write_all(data).unwrap();
        }
        let buf = zw.finish().unwrap();
        buf.into_inner()
    }

    #[test]
    fn zip_and_extract_roundtrip() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("src/main/resources")).unwrap();
        fs::write(src.path().join("manifest.mf"), b"Manifest").unwrap();
        fs::write(
            src.path().join("src/main/resources/flow.iflw"),
            b"<bpmn2/>",
        )
        .unwrap();

        let bytes = zip_dir_to_bytes(src.path()).unwrap();

        let dest = TempDir::new().unwrap();
        extract_zip_bytes(&bytes, dest.path()).unwrap();
        assert_eq!(
            fs::read(dest.path().join("manifest.mf")).unwrap(),
            b"Manifest"
        );
        assert_eq!(
            fs::read(dest.path().join("src/main/resources/flow.iflw")).unwrap(),
            b"<bpmn2/>"
        );
    }

    #[test]
    fn zip_output_is_deterministic() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("b.txt"), b"bee").unwrap();
        fs::write(src.path().join("a.txt"), b"ay").unwrap();

        let first = zip_dir_to_bytes(src.path()).unwrap();
        let second = zip_dir_to_bytes(src.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn extraction_rejects_parent_traversal_without_writing() {
        let archive = build_archive(&[("ok.txt", b"fine"), ("../evil.txt", b"bad")]);
        let dest = TempDir::new().unwrap();
        let err = extract_zip_bytes(&archive, dest.path()).unwrap_err();
        assert!(err.to_string().contains("escapes destination"));
        assert!(
            !dest.path().join("ok.txt").exists(),
            "no file may be written when any entry is unsafe"
        );
    }

    #[test]
    fn extraction_rejects_absolute_and_drive_paths() {
        for name in ["/etc/passwd", "c:/windows/evil", "a:b"] {
            let archive = build_archive(&[(name, b"bad")]);
            let dest = TempDir::new().unwrap();
            assert!(
                extract_zip_bytes(&archive, dest.path()).is_err(),
                "entry {name:?} must be rejected"
            );
        }
    }
}
