//! Per-host TLS trust decisions and coalescing of concurrent prompts.
//!
//! A page with a bad certificate reports one error per sub-resource, often
//! dozens at once. The first error for a fingerprint produces a
//! [`CertificatePrompt`]; later errors for the same fingerprint only queue
//! their responder. Resolving the prompt answers every queued responder with
//! the same decision.

mod certificate;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tokio::sync::oneshot;

use crate::registry::host_key;
use crate::storage::{atomic_write, quarantine, StorageError};

pub use certificate::Certificate;

/// File name of the trust store inside the data directory.
pub const TRUST_FILE: &str = "certificate.json";

/// The one question to put in front of the user for a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePrompt {
    pub url: String,
    pub error: String,
    pub certificate: Certificate,
    /// A different certificate was trusted for this host before.
    pub replaces_existing: bool,
}

/// What [`TrustStore::handle_certificate_error`] did with the responder.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Already trusted; the responder was answered `true`.
    Trusted,
    /// First error for this fingerprint; show the prompt.
    Prompt(CertificatePrompt),
    /// A prompt for this fingerprint is already open; the responder waits on it.
    Queued,
}

pub struct TrustStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
    pending: HashMap<String, Vec<oneshot::Sender<bool>>>,
}

impl TrustStore {
    /// Load `certificate.json`, failing soft to an empty store.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Trust store is corrupt, starting empty");
                    quarantine(path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read trust store");
                BTreeMap::new()
            }
        };

        tracing::debug!(path = %path.display(), hosts = entries.len(), "Loaded trust store");
        Self {
            path: Some(path.to_path_buf()),
            entries,
            pending: HashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
            pending: HashMap::new(),
        }
    }

    /// True iff the host of `url` has a stored signature equal to `certificate`'s.
    pub fn is_trusted(&self, url: &str, certificate: &Certificate) -> bool {
        host_key(url)
            .and_then(|host| self.entries.get(&host))
            .is_some_and(|stored| *stored == certificate.signature())
    }

    /// Whether any certificate was ever trusted for the host of `url`.
    pub fn has_entry(&self, url: &str) -> bool {
        host_key(url).is_some_and(|host| self.entries.contains_key(&host))
    }

    /// Store an approval. Rejections store nothing.
    pub fn record_decision(
        &mut self,
        url: &str,
        certificate: &Certificate,
        approved: bool,
    ) -> Result<(), StorageError> {
        if !approved {
            return Ok(());
        }
        let Some(host) = host_key(url) else {
            tracing::warn!(url = %url, "Cannot trust certificate for URL without host");
            return Ok(());
        };
        tracing::info!(host = %host, issuer = %certificate.issuer_name, "Trusting certificate");
        self.entries.insert(host, certificate.signature());
        self.save()
    }

    /// Entry point for every TLS error reported by a browsing context.
    pub fn handle_certificate_error(
        &mut self,
        url: &str,
        certificate: &Certificate,
        error: &str,
        respond: oneshot::Sender<bool>,
    ) -> Verdict {
        if self.is_trusted(url, certificate) {
            let _ = respond.send(true);
            return Verdict::Trusted;
        }

        if let Some(queue) = self.pending.get_mut(&certificate.fingerprint) {
            queue.push(respond);
            tracing::debug!(
                fingerprint = %certificate.fingerprint,
                queued = queue.len(),
                "Certificate prompt already open, queued"
            );
            return Verdict::Queued;
        }

        self.pending
            .insert(certificate.fingerprint.clone(), vec![respond]);
        tracing::info!(url = %url, fingerprint = %certificate.fingerprint, "Certificate prompt needed");

        Verdict::Prompt(CertificatePrompt {
            url: url.to_string(),
            error: error.to_string(),
            certificate: certificate.clone(),
            replaces_existing: self.has_entry(url),
        })
    }

    /// Apply the user's answer to the prompt for `certificate`.
    ///
    /// Every responder queued under the fingerprint, including ones added
    /// after the prompt opened, receives `approved`. Returns how many were
    /// answered; responders are answered even when persisting fails.
    pub fn resolve_prompt(
        &mut self,
        url: &str,
        certificate: &Certificate,
        approved: bool,
    ) -> Result<usize, StorageError> {
        let persisted = self.record_decision(url, certificate, approved);

        let queue = self
            .pending
            .remove(&certificate.fingerprint)
            .unwrap_or_default();
        let notified = queue.len();
        for respond in queue {
            let _ = respond.send(approved);
        }
        tracing::debug!(
            fingerprint = %certificate.fingerprint,
            approved,
            notified,
            "Certificate prompt resolved"
        );

        persisted.map(|()| notified)
    }

    pub fn is_pending(&self, fingerprint: &str) -> bool {
        self.pending.contains_key(fingerprint)
    }

    /// Forget every trusted certificate.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        tracing::info!(hosts = self.entries.len(), "Clearing trusted certificates");
        self.entries.clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_vec_pretty(&self.entries)?;
        atomic_write(path, &encoded).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist trust store");
        })
    }
}
