use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Persistence failures.
///
/// None of these are fatal: callers log them and surface a persistence warning
/// while the in-memory state keeps working.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The destination (or its temporary sibling) could not be written.
    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry of the data directory could not be deleted.
    #[error("Failed to remove '{}': {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized.
    #[error("Failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}
