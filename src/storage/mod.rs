//! Whole-file JSON persistence.
//!
//! Everything the shell remembers across restarts lives in two small JSON
//! documents inside the data directory:
//!
//! - `storage.json`: a flat string→string document ([`Store`]) holding the host
//!   registry, the sidebar ordering, the active host pointer and preferences
//! - `certificate.json`: the TLS trust decisions (owned by [`crate::trust`])
//!
//! Both are rewritten in full on every change through [`atomic_write`], so a
//! crash mid-write never leaves a truncated file behind.

mod atomic;
mod kv;
mod reset;
mod types;

pub use atomic::atomic_write;
pub(crate) use atomic::quarantine;
pub use kv::Store;
pub use reset::clear_dir;
pub use types::StorageError;
