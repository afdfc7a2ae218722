use sha2::{Digest, Sha256};

/// A certificate as presented by the embedder on a TLS error.
///
/// `data` is the PEM (or other textual) encoding; only its exact bytes
/// matter. The fingerprint identifies the certificate for prompt
/// coalescing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub issuer_name: String,
    pub data: String,
    pub fingerprint: String,
}

impl Certificate {
    /// Build a certificate whose fingerprint is the SHA-256 of `data`.
    pub fn new(issuer_name: impl Into<String>, data: impl Into<String>) -> Self {
        let data = data.into();
        let fingerprint = format!("sha256/{:x}", Sha256::digest(data.as_bytes()));
        Self {
            issuer_name: issuer_name.into(),
            data,
            fingerprint,
        }
    }

    /// Build a certificate with an embedder-supplied fingerprint.
    pub fn with_fingerprint(
        issuer_name: impl Into<String>,
        data: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            issuer_name: issuer_name.into(),
            data: data.into(),
            fingerprint: fingerprint.into(),
        }
    }

    /// Stored trust signature: issuer and raw data joined by a newline.
    pub fn signature(&self) -> String {
        format!("{}\n{}", self.issuer_name, self.data)
    }
}
