//! Durable registry of configured servers and the active-server pointer.
//!
//! Hosts live in `storage.json` under `rocket.chat.hosts` as a URL → host
//! mapping kept in insertion order; the active pointer lives under
//! `rocket.chat.currentHost`. Every mutation persists the whole mapping and
//! is announced as a [`RegistryEvent`].

mod host;
mod legacy;
mod probe;

use std::path::Path;

use secrecy::SecretString;
use thiserror::Error;

use crate::config::Config;
use crate::events::Emitter;
use crate::storage::Store;

pub use host::{canonical_string, host_key, is_under, parse_host_url, Host, ParsedHostUrl};
pub use probe::{resolve_host_input, validate_host, ProbeError};

pub const HOSTS_KEY: &str = "rocket.chat.hosts";
pub const ACTIVE_KEY: &str = "rocket.chat.currentHost";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Invalid server URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    HostAdded(String),
    HostRemoved(String),
    ActiveSet(String),
    ActiveCleared,
    TitleSet { url: String, title: String },
    /// The in-memory change stands but could not be written to disk.
    PersistFailed(String),
}

// ============================================================================
// Registry
// ============================================================================

pub struct Registry {
    store: Store,
    hosts: Vec<Host>,
    active: Option<String>,
    product_name: String,
    default_instance: String,
    events: Emitter<RegistryEvent>,
}

impl Registry {
    /// Rebuild the registry from `store`, migrating legacy encodings.
    ///
    /// Never fails: unreadable content yields an empty registry and the
    /// stored value is rewritten in canonical form.
    pub fn load(store: Store, config: &Config) -> Self {
        let decoded = store
            .get(HOSTS_KEY)
            .map(|raw| legacy::decode(&raw))
            .unwrap_or_default();

        let hosts: Vec<Host> = decoded.records.into_iter().map(Host::from).collect();
        let active = stored_active(&store).filter(|url| hosts.iter().any(|h| &h.url == url));

        let mut registry = Self {
            store,
            hosts,
            active,
            product_name: config.product_name.clone(),
            default_instance: config.default_instance.clone(),
            events: Emitter::new(),
        };

        if decoded.migrated {
            tracing::info!(hosts = registry.hosts.len(), "Rewriting migrated host list");
            registry.persist_hosts();
        }

        tracing::info!(
            hosts = registry.hosts.len(),
            active = ?registry.active,
            "Loaded host registry"
        );
        registry
    }

    /// Import a title → URL `servers.json` seed when the registry is empty.
    ///
    /// Returns how many hosts were imported. A missing or invalid file imports
    /// nothing.
    pub fn import_seed(&mut self, path: &Path) -> usize {
        if !self.hosts.is_empty() {
            return 0;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read server seed file");
                return 0;
            }
        };

        let seed: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&content)
        {
            Ok(seed) => seed,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Server seed file invalid");
                return 0;
            }
        };

        for (title, url) in seed {
            let Some(url) = url.as_str() else {
                tracing::warn!(title = %title, "Skipping non-string seed entry");
                continue;
            };
            let parsed = match parse_host_url(url) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(title = %title, error = %e, "Skipping invalid seed entry");
                    continue;
                }
            };
            if self.host_exists(&parsed.url) {
                continue;
            }
            self.hosts.push(Host::from_parsed(parsed, Some(title)));
        }

        if !self.hosts.is_empty() {
            tracing::info!(path = %path.display(), hosts = self.hosts.len(), "Imported server seed");
            self.persist_hosts();
        }
        self.hosts.len()
    }

    pub fn subscribe(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Hosts in insertion order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn get(&self, url: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.url == url)
    }

    pub fn host_exists(&self, url: &str) -> bool {
        self.get(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Add a server from user or protocol input.
    ///
    /// Returns `Ok(Some(url))` with the canonical URL of a newly inserted
    /// host, or `Ok(None)` when the host already existed, in which case it is
    /// activated instead.
    ///
    /// # Errors
    ///
    /// [`HostError`] when `raw_url` is not an http(s) URL.
    pub fn add_host(&mut self, raw_url: &str) -> Result<Option<String>, HostError> {
        let parsed = parse_host_url(raw_url)?;

        if self.host_exists(&parsed.url) {
            tracing::debug!(url = %parsed.url, "Host already present, activating");
            self.set_active(&parsed.url);
            return Ok(None);
        }

        let url = parsed.url.clone();
        self.hosts.push(Host::from_parsed(parsed, None));
        self.persist_hosts();

        tracing::info!(url = %url, "Added host");
        self.events.emit(RegistryEvent::HostAdded(url.clone()));
        Ok(Some(url))
    }

    /// Remove a host. Returns `false` if it was not present.
    pub fn remove_host(&mut self, url: &str) -> bool {
        let Some(index) = self.hosts.iter().position(|h| h.url == url) else {
            return false;
        };
        self.hosts.remove(index);
        self.persist_hosts();

        tracing::info!(url = %url, "Removed host");
        self.events.emit(RegistryEvent::HostRemoved(url.to_string()));

        if self.active.as_deref() == Some(url) {
            self.clear_active();
        }
        true
    }

    /// Make `url` the active host.
    ///
    /// An unknown URL falls back to the first host in insertion order; with
    /// no hosts at all the selection is cleared. Returns the URL that became
    /// active.
    pub fn set_active(&mut self, url: &str) -> Option<String> {
        let resolved = if self.host_exists(url) {
            Some(url.to_string())
        } else {
            self.hosts.first().map(|h| h.url.clone())
        };

        let Some(resolved) = resolved else {
            self.clear_active();
            return None;
        };

        if resolved != url {
            tracing::debug!(requested = %url, resolved = %resolved, "Unknown host, falling back");
        }

        self.active = Some(resolved.clone());
        if let Err(e) = self.store.set(ACTIVE_KEY, resolved.as_str()) {
            self.events.emit(RegistryEvent::PersistFailed(e.to_string()));
        }
        self.events.emit(RegistryEvent::ActiveSet(resolved.clone()));
        Some(resolved)
    }

    /// Drop the active pointer (landing page).
    pub fn clear_active(&mut self) {
        self.active = None;
        if let Err(e) = self.store.remove(ACTIVE_KEY) {
            self.events.emit(RegistryEvent::PersistFailed(e.to_string()));
        }
        self.events.emit(RegistryEvent::ActiveCleared);
    }

    /// Re-apply the stored pointer at start-up, with the usual fallback.
    pub fn restore_active(&mut self) -> Option<String> {
        let stored = stored_active(&self.store).unwrap_or_default();
        self.set_active(&stored)
    }

    /// Update a host's display title.
    ///
    /// A title equal to the bare product name gets ` - <url>` appended unless
    /// the host is the default instance, so several servers stay tellable
    /// apart.
    pub fn set_host_title(&mut self, url: &str, title: &str) -> bool {
        let is_default_instance = host_key(url).is_some()
            && host_key(url) == host_key(&self.default_instance);
        let title = if title == self.product_name && !is_default_instance {
            format!("{} - {}", title, url)
        } else {
            title.to_string()
        };

        let Some(host) = self.hosts.iter_mut().find(|h| h.url == url) else {
            tracing::debug!(url = %url, "Title for unknown host ignored");
            return false;
        };
        if host.title == title {
            return true;
        }
        host.title = title.clone();
        self.persist_hosts();

        self.events.emit(RegistryEvent::TitleSet {
            url: url.to_string(),
            title,
        });
        true
    }

    /// Remember the last in-origin location of a host.
    pub fn set_last_path(&mut self, url: &str, last_path: &str) -> bool {
        let Some(host) = self.hosts.iter_mut().find(|h| h.url == url) else {
            return false;
        };
        if host.last_path.as_deref() == Some(last_path) {
            return true;
        }
        host.last_path = Some(last_path.to_string());
        self.persist_hosts();
        true
    }

    /// The host `url` belongs to. With nested hosts on one origin the one
    /// with the longest path wins.
    pub fn owner_of(&self, url: &str) -> Option<&Host> {
        self.hosts
            .iter()
            .filter(|h| h.owns(url))
            .max_by_key(|h| h.url.len())
    }

    /// Basic-auth credentials for a request to `request_url`, taken from the
    /// host that owns it.
    pub fn credentials_for(&self, request_url: &str) -> Option<(String, SecretString)> {
        let host = self.owner_of(request_url)?;
        match (&host.username, &host.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }

    fn persist_hosts(&mut self) {
        let mapping: serde_json::Map<String, serde_json::Value> = self
            .hosts
            .iter()
            .filter_map(|h| {
                serde_json::to_value(host::HostRecord::from(h))
                    .ok()
                    .map(|v| (h.url.clone(), v))
            })
            .collect();

        if let Err(e) = self.store.set_json(HOSTS_KEY, &mapping) {
            self.events.emit(RegistryEvent::PersistFailed(e.to_string()));
        }
    }
}

/// The stored active pointer in canonical form; older versions saved it as typed.
fn stored_active(store: &Store) -> Option<String> {
    let raw = store.get(ACTIVE_KEY)?;
    Some(parse_host_url(&raw).map(|parsed| parsed.url).unwrap_or(raw))
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("hosts", &self.hosts)
            .field("active", &self.active)
            .finish()
    }
}
