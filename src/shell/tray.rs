use std::fmt;
use std::str::FromStr;

use crate::events::Emitter;
use crate::sidebar::GlobalBadge;

use super::Platform;

/// Presence reported by a server page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStatus {
    #[default]
    Online,
    Away,
    Busy,
    Offline,
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(UserStatus::Online),
            "away" => Ok(UserStatus::Away),
            "busy" => Ok(UserStatus::Busy),
            "offline" => Ok(UserStatus::Offline),
            other => Err(format!("unknown user status '{}'", other)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserStatus::Online => "online",
            UserStatus::Away => "away",
            UserStatus::Busy => "busy",
            UserStatus::Offline => "offline",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayState {
    pub badge: GlobalBadge,
    pub status: UserStatus,
    pub main_window_visible: bool,
    pub show_icon: bool,
    pub show_user_status: bool,
}

impl Default for TrayState {
    fn default() -> Self {
        Self {
            badge: GlobalBadge::default(),
            status: UserStatus::Online,
            main_window_visible: true,
            show_icon: true,
            show_user_status: true,
        }
    }
}

/// Partial update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrayPatch {
    pub badge: Option<GlobalBadge>,
    pub status: Option<UserStatus>,
    pub main_window_visible: Option<bool>,
    pub show_icon: Option<bool>,
    pub show_user_status: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayIcon {
    /// Monochrome template image (macOS menu bar).
    pub template: bool,
    pub status: Option<UserStatus>,
    pub badge_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMenuAction {
    SetMainWindowVisibility(bool),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayMenuItem {
    pub label: &'static str,
    pub action: TrayMenuAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayPresentation {
    pub icon: TrayIcon,
    pub tooltip: String,
    /// Text next to the icon; only shown on macOS.
    pub title: Option<String>,
    pub menu: Vec<TrayMenuItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayEvent {
    Created,
    Destroyed,
}

pub struct Tray {
    platform: Platform,
    state: TrayState,
    icon_present: bool,
    events: Emitter<TrayEvent>,
}

impl Tray {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            state: TrayState::default(),
            icon_present: false,
            events: Emitter::new(),
        }
    }

    pub fn subscribe(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<TrayEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &TrayState {
        &self.state
    }

    pub fn has_icon(&self) -> bool {
        self.icon_present
    }

    /// Merge `patch` and re-render. `None` means the icon is gone.
    pub fn set_state(&mut self, patch: TrayPatch) -> Option<TrayPresentation> {
        let TrayPatch {
            badge,
            status,
            main_window_visible,
            show_icon,
            show_user_status,
        } = patch;
        if let Some(badge) = badge {
            self.state.badge = badge;
        }
        if let Some(status) = status {
            self.state.status = status;
        }
        if let Some(visible) = main_window_visible {
            self.state.main_window_visible = visible;
        }
        if let Some(show) = show_icon {
            self.state.show_icon = show;
        }
        if let Some(show) = show_user_status {
            self.state.show_user_status = show;
        }
        self.render()
    }

    fn render(&mut self) -> Option<TrayPresentation> {
        if !self.state.show_icon {
            if self.icon_present {
                self.icon_present = false;
                tracing::debug!("Tray icon destroyed");
                self.events.emit(TrayEvent::Destroyed);
            }
            return None;
        }

        if !self.icon_present {
            self.icon_present = true;
            tracing::debug!("Tray icon created");
            self.events.emit(TrayEvent::Created);
        }

        Some(self.presentation())
    }

    pub fn presentation(&self) -> TrayPresentation {
        let state = &self.state;
        let mac = self.platform == Platform::MacOs;

        let icon = TrayIcon {
            template: mac,
            status: state.show_user_status.then_some(state.status),
            badge_text: if mac { None } else { state.badge.badge_text() },
        };

        let title = mac.then(|| {
            if state.badge.count > 0 {
                state.badge.title.clone()
            } else {
                String::new()
            }
        });

        let visible = state.main_window_visible;
        let menu = vec![
            TrayMenuItem {
                label: if visible { "Hide" } else { "Show" },
                action: TrayMenuAction::SetMainWindowVisibility(!visible),
            },
            TrayMenuItem {
                label: "Quit",
                action: TrayMenuAction::Quit,
            },
        ];

        TrayPresentation {
            icon,
            tooltip: message_count(state.badge.count),
            title,
            menu,
        }
    }

    /// What a left click on the icon does.
    pub fn click(&self) -> TrayMenuAction {
        TrayMenuAction::SetMainWindowVisibility(!self.state.main_window_visible)
    }
}

fn message_count(count: u32) -> String {
    match count {
        0 => "No unread messages".to_string(),
        1 => "1 unread message".to_string(),
        n => format!("{} unread messages", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn badge(count: u32, title: &str) -> GlobalBadge {
        GlobalBadge {
            count,
            title: title.to_string(),
            show_alert: !title.is_empty(),
        }
    }

    #[test]
    fn test_hiding_destroys_icon_once() {
        let mut tray = Tray::new(Platform::Linux);
        let mut events = tray.subscribe();

        assert!(tray.set_state(TrayPatch::default()).is_some());
        assert_eq!(events.try_recv().unwrap(), TrayEvent::Created);

        let hidden = tray.set_state(TrayPatch {
            show_icon: Some(false),
            ..Default::default()
        });
        assert!(hidden.is_none());
        assert_eq!(events.try_recv().unwrap(), TrayEvent::Destroyed);

        tray.set_state(TrayPatch {
            badge: Some(badge(2, "2")),
            ..Default::default()
        });
        assert!(events.try_recv().is_err());
        assert!(!tray.has_icon());
    }

    #[test]
    fn test_patch_keeps_unspecified_fields() {
        let mut tray = Tray::new(Platform::Linux);
        tray.set_state(TrayPatch {
            status: Some(UserStatus::Away),
            ..Default::default()
        });
        tray.set_state(TrayPatch {
            badge: Some(badge(3, "3")),
            ..Default::default()
        });
        assert_eq!(tray.state().status, UserStatus::Away);
        assert_eq!(tray.state().badge.count, 3);
    }

    #[test]
    fn test_linux_icon_carries_badge_and_status() {
        let mut tray = Tray::new(Platform::Linux);
        let presentation = tray
            .set_state(TrayPatch {
                badge: Some(badge(12, "12")),
                status: Some(UserStatus::Busy),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            presentation.icon,
            TrayIcon {
                template: false,
                status: Some(UserStatus::Busy),
                badge_text: Some("9+".into()),
            }
        );
        assert_eq!(presentation.tooltip, "12 unread messages");
        assert_eq!(presentation.title, None);
    }

    #[test]
    fn test_macos_uses_template_and_title() {
        let mut tray = Tray::new(Platform::MacOs);
        let presentation = tray
            .set_state(TrayPatch {
                badge: Some(badge(4, "4")),
                show_user_status: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(presentation.icon.template);
        assert_eq!(presentation.icon.badge_text, None);
        assert_eq!(presentation.icon.status, None);
        assert_eq!(presentation.title.as_deref(), Some("4"));

        let presentation = tray
            .set_state(TrayPatch {
                badge: Some(badge(0, "•")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(presentation.title.as_deref(), Some(""));
    }

    #[test]
    fn test_context_menu_follows_window_visibility() {
        let mut tray = Tray::new(Platform::Windows);
        let shown = tray.set_state(TrayPatch::default()).unwrap();
        assert_eq!(shown.menu[0].label, "Hide");
        assert_eq!(
            shown.menu[0].action,
            TrayMenuAction::SetMainWindowVisibility(false)
        );

        let hidden = tray
            .set_state(TrayPatch {
                main_window_visible: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(hidden.menu[0].label, "Show");
        assert_eq!(tray.click(), TrayMenuAction::SetMainWindowVisibility(true));
        assert_eq!(hidden.menu[1].action, TrayMenuAction::Quit);
    }

    #[test]
    fn test_user_status_parse() {
        assert_eq!("away".parse::<UserStatus>(), Ok(UserStatus::Away));
        assert!("dnd".parse::<UserStatus>().is_err());
        assert_eq!(UserStatus::Busy.to_string(), "busy");
    }
}
