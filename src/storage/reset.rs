use std::path::Path;

use super::types::StorageError;

/// Delete everything inside `dir` except the entries named in `keep`.
///
/// Returns how many entries were removed. A missing directory counts as empty.
pub fn clear_dir(dir: &Path, keep: &[&str]) -> Result<usize, StorageError> {
    let remove_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| StorageError::Remove { path, source }
    };

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(remove_err(dir)(e)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(remove_err(dir))?;
        if keep.iter().any(|name| entry.file_name() == *name) {
            continue;
        }
        let path = entry.path();
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let result = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(remove_err(&path))?;
        tracing::debug!(path = %path.display(), "Removed app data entry");
        removed += 1;
    }
    Ok(removed)
}
