use crate::sidebar::GlobalBadge;

use super::tray::UserStatus;
use super::Platform;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockState {
    pub badge: GlobalBadge,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DockPatch {
    pub badge: Option<GlobalBadge>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockPresentation {
    pub badge_text: Option<String>,
    /// Window icon overlay instead of a dock label (Windows, Linux).
    pub overlay: bool,
    /// Unread count went from zero to non-zero (macOS bounces the dock icon).
    pub bounce: bool,
    /// Taskbar flash state; only set while the main window is unfocused.
    pub flash_frame: Option<bool>,
}

pub struct Dock {
    platform: Platform,
    state: DockState,
}

impl Dock {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            state: DockState::default(),
        }
    }

    pub fn state(&self) -> &DockState {
        &self.state
    }

    pub fn set_state(&mut self, patch: DockPatch, window_focused: bool) -> DockPresentation {
        let previous_count = self.state.badge.count;
        if let Some(badge) = patch.badge {
            self.state.badge = badge;
        }
        if let Some(status) = patch.status {
            self.state.status = status;
        }

        let count = self.state.badge.count;
        DockPresentation {
            badge_text: self.state.badge.badge_text(),
            overlay: self.platform != Platform::MacOs,
            bounce: self.platform == Platform::MacOs && previous_count == 0 && count > 0,
            flash_frame: (!window_focused).then_some(count > 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn badge(count: u32) -> GlobalBadge {
        GlobalBadge {
            count,
            title: if count > 0 { count.to_string() } else { String::new() },
            show_alert: count > 0,
        }
    }

    fn with_badge(count: u32) -> DockPatch {
        DockPatch {
            badge: Some(badge(count)),
            ..Default::default()
        }
    }

    #[test]
    fn test_bounces_only_on_transition_from_zero() {
        let mut dock = Dock::new(Platform::MacOs);
        assert!(dock.set_state(with_badge(2), true).bounce);
        assert!(!dock.set_state(with_badge(5), true).bounce);
        assert!(!dock.set_state(with_badge(0), true).bounce);
        assert!(dock.set_state(with_badge(1), true).bounce);
    }

    #[test]
    fn test_no_bounce_off_macos() {
        let mut dock = Dock::new(Platform::Linux);
        let presentation = dock.set_state(with_badge(3), true);
        assert!(!presentation.bounce);
        assert!(presentation.overlay);
        assert_eq!(presentation.badge_text.as_deref(), Some("3"));
    }

    #[test]
    fn test_flashes_only_when_unfocused() {
        let mut dock = Dock::new(Platform::Windows);
        assert_eq!(dock.set_state(with_badge(1), true).flash_frame, None);
        assert_eq!(dock.set_state(with_badge(1), false).flash_frame, Some(true));
        assert_eq!(dock.set_state(with_badge(0), false).flash_frame, Some(false));
    }

    #[test]
    fn test_status_patch_keeps_badge() {
        let mut dock = Dock::new(Platform::MacOs);
        dock.set_state(with_badge(4), true);
        let presentation = dock.set_state(
            DockPatch {
                status: Some(UserStatus::Away),
                ..Default::default()
            },
            true,
        );
        assert_eq!(dock.state().status, UserStatus::Away);
        assert_eq!(presentation.badge_text.as_deref(), Some("4"));
        assert!(!presentation.bounce);
    }
}
