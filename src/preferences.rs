//! Shell preferences: config.toml defaults with persisted overrides.
//!
//! Overrides live in `storage.json` as JSON booleans under the keys the
//! desktop client has always used. Some keys store the inverse of the
//! preference (`hideTray`, `autohideMenu`, `sidebar-closed`).

use crate::config::Config;
use crate::shell::Preference;
use crate::storage::{StorageError, Store};

// ============================================================================
// Storage keys
// ============================================================================

pub const HIDE_TRAY_KEY: &str = "hideTray";
pub const SHOW_USER_STATUS_KEY: &str = "showUserStatusInTray";
pub const SHOW_WINDOW_ON_UNREAD_KEY: &str = "showWindowOnUnreadChanged";
pub const AUTOHIDE_MENU_KEY: &str = "autohideMenu";
pub const SIDEBAR_CLOSED_KEY: &str = "sidebar-closed";

/// Where a preference is persisted and whether the stored flag is inverted.
fn storage_key(preference: Preference) -> Option<(&'static str, bool)> {
    match preference {
        Preference::ShowTrayIcon => Some((HIDE_TRAY_KEY, true)),
        Preference::ShowUserStatusInTray => Some((SHOW_USER_STATUS_KEY, false)),
        Preference::ShowWindowOnUnreadChanged => Some((SHOW_WINDOW_ON_UNREAD_KEY, false)),
        Preference::ShowMenuBar => Some((AUTOHIDE_MENU_KEY, true)),
        Preference::ShowServerList => Some((SIDEBAR_CLOSED_KEY, true)),
        // Full screen is window state, not a stored preference.
        Preference::ShowFullScreen => None,
    }
}

// ============================================================================
// PreferenceManager
// ============================================================================

pub struct PreferenceManager {
    store: Store,
    show_tray_icon: bool,
    show_user_status_in_tray: bool,
    show_window_on_unread_changed: bool,
    show_menu_bar: bool,
    show_server_list: bool,
}

impl PreferenceManager {
    pub fn new(store: Store, config: &Config) -> Self {
        Self {
            store,
            show_tray_icon: config.show_tray_icon_default(),
            show_user_status_in_tray: config.show_user_status_in_tray,
            show_window_on_unread_changed: config.show_window_on_unread_changed,
            show_menu_bar: config.show_menu_bar,
            show_server_list: config.show_server_list,
        }
    }

    fn default_for(&self, preference: Preference) -> bool {
        match preference {
            Preference::ShowTrayIcon => self.show_tray_icon,
            Preference::ShowUserStatusInTray => self.show_user_status_in_tray,
            Preference::ShowWindowOnUnreadChanged => self.show_window_on_unread_changed,
            Preference::ShowMenuBar => self.show_menu_bar,
            Preference::ShowServerList => self.show_server_list,
            Preference::ShowFullScreen => false,
        }
    }

    /// Current value; `None` for preferences that are not stored here.
    pub fn get(&self, preference: Preference) -> Option<bool> {
        let (key, inverted) = storage_key(preference)?;
        let stored = self.store.get(key).and_then(|raw| match raw.trim() {
            "true" => Some(true),
            "false" => Some(false),
            other => {
                tracing::warn!(key = %key, value = %other, "Ignoring non-boolean preference");
                None
            }
        });
        Some(match stored {
            Some(flag) => flag != inverted,
            None => self.default_for(preference),
        })
    }

    pub fn set(&mut self, preference: Preference, value: bool) -> Result<(), StorageError> {
        let Some((key, inverted)) = storage_key(preference) else {
            return Ok(());
        };
        let stored = value != inverted;
        self.store.set(key, stored.to_string())
    }

    /// Flip a stored preference and return its new value.
    pub fn toggle(&mut self, preference: Preference) -> Result<Option<bool>, StorageError> {
        let Some(current) = self.get(preference) else {
            return Ok(None);
        };
        self.set(preference, !current)?;
        Ok(Some(!current))
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    pub fn show_tray_icon(&self) -> bool {
        self.get(Preference::ShowTrayIcon).unwrap_or(self.show_tray_icon)
    }

    pub fn show_user_status_in_tray(&self) -> bool {
        self.get(Preference::ShowUserStatusInTray)
            .unwrap_or(self.show_user_status_in_tray)
    }

    pub fn show_window_on_unread_changed(&self) -> bool {
        self.get(Preference::ShowWindowOnUnreadChanged)
            .unwrap_or(self.show_window_on_unread_changed)
    }

    pub fn show_menu_bar(&self) -> bool {
        self.get(Preference::ShowMenuBar).unwrap_or(self.show_menu_bar)
    }

    pub fn show_server_list(&self) -> bool {
        self.get(Preference::ShowServerList).unwrap_or(self.show_server_list)
    }
}

// ============================================================================
// Tests
// ============================================================================
