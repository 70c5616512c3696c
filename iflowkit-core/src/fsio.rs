//! Atomic file writes and small filesystem helpers.

use std::io::Write;
use std::path::Path;

use crate::error::{io_err, CoreError};

/// Create `path` and all missing parents.
pub fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    std::fs::create_dir_all(path).map_err(|e| io_err(path, e))
}

/// Atomically write `data` to `path`.
///
/// Writes a temp file in the destination directory (same filesystem), then
/// renames over the target. The destination is removed first on platforms
/// where rename-over-existing is not supported.
pub fn atomic_write_file(path: &Path, data: &[u8]) -> Result<(), CoreError> {
    let dir = path.parent().ok_or_else(|| {
        io_err(
            path,
            std::io::Error::other("destination has no parent directory"),
        )
    })?;
    ensure_dir(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    tmp.write_all(data).map_err(|e| io_err(tmp.path(), e))?;
    tmp.flush().map_err(|e| io_err(tmp.path(), e))?;

    #[cfg(windows)]
    let _ = std::fs::remove_file(path);

    tmp.persist(path)
        .map_err(|e| io_err(path, e.error))
        .map(|_| ())
}
