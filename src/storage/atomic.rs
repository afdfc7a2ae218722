use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;

use super::types::StorageError;

/// Atomically replace `dst` with `contents` using write-to-temp-then-rename.
///
/// The destination is never observed in a partial state: either the previous
/// file or the complete new one is on disk. On Unix the file is created with
/// mode 0600 since the registry can hold basic-auth credentials.
///
/// # Errors
///
/// Returns [`StorageError::Write`] if the temporary file cannot be created,
/// written, synced or renamed. The temporary file is removed on failure.
pub fn atomic_write(dst: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let write_err = |source: std::io::Error| StorageError::Write {
        path: dst.to_path_buf(),
        source,
    };

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    // Randomized temp filename so a stale or hostile file at a predictable
    // path cannot be reused.
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut temp_file = options.open(&temp_path).map_err(write_err)?;

    let written = temp_file
        .write_all(contents)
        .and_then(|()| temp_file.sync_all());
    drop(temp_file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    // On Windows, rename fails if destination exists, so remove it first
    #[cfg(windows)]
    if dst.exists() {
        if let Err(e) = std::fs::remove_file(dst) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(write_err(e));
        }
    }

    if let Err(e) = std::fs::rename(&temp_path, dst) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    Ok(())
}

/// Move an unreadable document aside so the next write starts clean.
///
/// Returns the quarantine path, or `None` when the rename failed (the caller
/// then simply overwrites the corrupt file on the next save).
pub(crate) fn quarantine(path: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    let target = path.with_file_name(format!(
        "{}.corrupt.{}",
        file_name,
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    match std::fs::rename(path, &target) {
        Ok(()) => {
            tracing::warn!(
                from = %path.display(),
                to = %target.display(),
                "Quarantined unreadable storage file"
            );
            Some(target)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to quarantine storage file");
            None
        }
    }
}
