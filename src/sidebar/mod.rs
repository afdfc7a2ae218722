//! Server list presenter: visual ordering, labels and per-host badges.
//!
//! The ordering lives in `storage.json` under `rocket.chat.sortOrder`,
//! separate from the registry's insertion order, and always holds exactly the
//! registry's URLs.

mod badge;

use std::collections::HashMap;

use serde::Deserialize;

use crate::events::Emitter;
use crate::registry::Host;
use crate::storage::Store;

pub use badge::{Badge, GlobalBadge, DOT};

pub const SORT_ORDER_KEY: &str = "rocket.chat.sortOrder";

/// Colours a server page asks the sidebar to adopt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SidebarStyle {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEvent {
    /// The visual order changed; carries the full new order.
    HostsSorted(Vec<String>),
    BadgeChanged { url: String, badge: Option<Badge> },
    StyleChanged(SidebarStyle),
    VisibilityChanged { hidden: bool },
    PersistFailed(String),
}

/// One row of the server list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarItem {
    pub url: String,
    pub label: String,
    pub abbreviation: String,
    pub favicon: String,
    pub badge: Option<Badge>,
    pub active: bool,
}

#[derive(Debug, Default)]
struct Entry {
    label: String,
    badge: Option<Badge>,
}

pub struct Sidebar {
    store: Store,
    order: Vec<String>,
    entries: HashMap<String, Entry>,
    active: Option<String>,
    style: SidebarStyle,
    hidden: bool,
    events: Emitter<SidebarEvent>,
}

impl Sidebar {
    /// Build the presenter for `hosts`, reconciling the stored ordering.
    ///
    /// Stored URLs without a host are dropped; hosts missing from the stored
    /// ordering are appended in insertion order.
    pub fn new(store: Store, hosts: &[Host], hidden: bool) -> Self {
        let stored: Vec<String> = store
            .get(SORT_ORDER_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(order) => Some(order),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored server order is unreadable, rebuilding");
                    None
                }
            })
            .unwrap_or_default();

        let mut order: Vec<String> = Vec::with_capacity(hosts.len());
        for url in stored {
            if hosts.iter().any(|h| h.url == url) && !order.contains(&url) {
                order.push(url);
            }
        }
        for host in hosts {
            if !order.contains(&host.url) {
                order.push(host.url.clone());
            }
        }

        let entries = hosts
            .iter()
            .map(|h| {
                (
                    h.url.clone(),
                    Entry {
                        label: h.title.clone(),
                        badge: None,
                    },
                )
            })
            .collect();

        let mut sidebar = Self {
            store,
            order,
            entries,
            active: None,
            style: SidebarStyle::default(),
            hidden,
            events: Emitter::new(),
        };
        sidebar.persist_order();
        sidebar
    }

    pub fn subscribe(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<SidebarEvent> {
        self.events.subscribe()
    }

    /// URLs in visual order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Append a new host at the end of the list.
    pub fn add_host(&mut self, host: &Host) {
        if self.order.contains(&host.url) {
            return;
        }
        self.order.push(host.url.clone());
        self.entries.insert(
            host.url.clone(),
            Entry {
                label: host.title.clone(),
                badge: None,
            },
        );
        self.persist_order();
        self.events.emit(SidebarEvent::HostsSorted(self.order.clone()));
    }

    pub fn remove_host(&mut self, url: &str) {
        let Some(index) = self.order.iter().position(|u| u == url) else {
            return;
        };
        self.order.remove(index);
        let had_badge = self
            .entries
            .remove(url)
            .is_some_and(|entry| entry.badge.is_some());
        if self.active.as_deref() == Some(url) {
            self.active = None;
        }
        self.persist_order();
        self.events.emit(SidebarEvent::HostsSorted(self.order.clone()));
        if had_badge {
            self.events.emit(SidebarEvent::BadgeChanged {
                url: url.to_string(),
                badge: None,
            });
        }
    }

    /// Move one host to `index` (clamped to the end of the list).
    ///
    /// The whole ordering is rewritten in one write. Moving a host onto its
    /// own position succeeds without changes. Returns `false` for an unknown
    /// URL.
    pub fn move_host(&mut self, url: &str, index: usize) -> bool {
        let Some(from) = self.order.iter().position(|u| u == url) else {
            tracing::debug!(url = %url, "Cannot move unknown host");
            return false;
        };
        let to = index.min(self.order.len() - 1);
        if from == to {
            return true;
        }

        let moved = self.order.remove(from);
        self.order.insert(to, moved);
        tracing::debug!(url = %url, from, to, "Moved host");

        self.persist_order();
        self.events.emit(SidebarEvent::HostsSorted(self.order.clone()));
        true
    }

    pub fn set_label(&mut self, url: &str, label: &str) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.label = label.to_string();
        }
    }

    pub fn set_badge(&mut self, url: &str, badge: Option<Badge>) {
        let Some(entry) = self.entries.get_mut(url) else {
            tracing::debug!(url = %url, "Badge for unknown host ignored");
            return;
        };
        entry.badge = badge;
        self.events.emit(SidebarEvent::BadgeChanged {
            url: url.to_string(),
            badge,
        });
    }

    pub fn badge(&self, url: &str) -> Option<Badge> {
        self.entries.get(url).and_then(|e| e.badge)
    }

    pub fn global_badge(&self) -> GlobalBadge {
        GlobalBadge::aggregate(self.entries.values().filter_map(|e| e.badge.as_ref()))
    }

    pub fn set_active(&mut self, url: Option<&str>) {
        self.active = url
            .filter(|u| self.entries.contains_key(*u))
            .map(str::to_string);
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn change_style(&mut self, style: SidebarStyle) {
        if self.style == style {
            return;
        }
        self.style = style.clone();
        self.events.emit(SidebarEvent::StyleChanged(style));
    }

    pub fn style(&self) -> &SidebarStyle {
        &self.style
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        if self.hidden == hidden {
            return;
        }
        self.hidden = hidden;
        self.events.emit(SidebarEvent::VisibilityChanged { hidden });
    }

    /// Rows in visual order.
    pub fn items(&self) -> Vec<SidebarItem> {
        self.order
            .iter()
            .filter_map(|url| {
                let entry = self.entries.get(url)?;
                Some(SidebarItem {
                    url: url.clone(),
                    abbreviation: abbreviation(&entry.label),
                    label: entry.label.clone(),
                    favicon: favicon_url(url),
                    badge: entry.badge,
                    active: self.active.as_deref() == Some(url.as_str()),
                })
            })
            .collect()
    }

    fn persist_order(&mut self) {
        if let Err(e) = self.store.set_json(SORT_ORDER_KEY, &self.order) {
            self.events.emit(SidebarEvent::PersistFailed(e.to_string()));
        }
    }
}

/// Initials shown until a favicon loads.
///
/// The domain of a URL-like title (scheme and `www.` dropped) or the title
/// itself is split on dots; the first letters of the first two labels are
/// upper-cased.
pub fn abbreviation(title: &str) -> String {
    let name = title
        .strip_prefix("https://")
        .or_else(|| title.strip_prefix("http://"))
        .map(|rest| {
            let rest = rest.strip_prefix("www.").unwrap_or(rest);
            rest.split('/').next().unwrap_or(rest)
        })
        .unwrap_or(title);

    name.split('.')
        .take(2)
        .filter_map(|label| label.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn favicon_url(url: &str) -> String {
    format!("{}/assets/favicon.svg", url.trim_end_matches('/'))
}
