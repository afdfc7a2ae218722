//! OS chrome mirror: tray, dock and application menu.
//!
//! Each target keeps its own state snapshot, merges partial updates and
//! renders a presentation value. [`Shell`] owns the targets and hands every
//! presentation to a [`ChromeBackend`], which is the only part that touches
//! the platform.

mod command;
mod dock;
mod menu;
mod tray;

pub use command::{Preference, ShellCommand, ShellRequest};
pub use dock::{Dock, DockPatch, DockPresentation, DockState};
pub use menu::{AppMenu, MenuItem, MenuPatch, MenuPresentation, MenuServer, MenuState, Role};
pub use tray::{
    Tray, TrayEvent, TrayIcon, TrayMenuAction, TrayMenuItem, TrayPatch, TrayPresentation,
    TrayState, UserStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }
}

/// Main window operations requested by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    Show,
    /// Show without taking focus.
    ShowInactive,
    Hide,
    FlashFrame(bool),
    SetFullScreen(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    pub visible: bool,
    pub focused: bool,
    pub full_screen: bool,
    /// Closing hides to the tray instead of quitting.
    pub hide_on_close: bool,
}

impl Default for WindowState {
    fn default() -> Self {
        Self {
            visible: true,
            focused: true,
            full_screen: false,
            hide_on_close: false,
        }
    }
}

/// Platform side of the chrome.
pub trait ChromeBackend: Send {
    fn render_tray(&mut self, tray: Option<&TrayPresentation>);
    fn render_dock(&mut self, dock: &DockPresentation);
    fn render_menu(&mut self, menu: &MenuPresentation);
    fn window(&mut self, action: WindowAction);
}

/// Backend for headless runs: every render becomes a log line.
#[derive(Debug, Default)]
pub struct LoggingBackend;

impl ChromeBackend for LoggingBackend {
    fn render_tray(&mut self, tray: Option<&TrayPresentation>) {
        match tray {
            Some(tray) => tracing::info!(
                tooltip = %tray.tooltip,
                badge = ?tray.icon.badge_text,
                status = ?tray.icon.status,
                "Tray updated"
            ),
            None => tracing::info!("Tray hidden"),
        }
    }

    fn render_dock(&mut self, dock: &DockPresentation) {
        tracing::info!(badge = ?dock.badge_text, bounce = dock.bounce, "Dock updated");
    }

    fn render_menu(&mut self, menu: &MenuPresentation) {
        tracing::debug!(
            items = menu.commands().len(),
            menu_bar = ?menu.menu_bar_visible,
            "Menu rebuilt"
        );
    }

    fn window(&mut self, action: WindowAction) {
        tracing::info!(action = ?action, "Window");
    }
}

pub struct Shell {
    tray: Tray,
    dock: Dock,
    menu: AppMenu,
    window: WindowState,
    backend: Box<dyn ChromeBackend>,
}

impl Shell {
    pub fn new(platform: Platform, app_name: &str, backend: Box<dyn ChromeBackend>) -> Self {
        Self {
            tray: Tray::new(platform),
            dock: Dock::new(platform),
            menu: AppMenu::new(platform, app_name),
            window: WindowState::default(),
            backend,
        }
    }

    pub fn subscribe_tray(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<TrayEvent> {
        self.tray.subscribe()
    }

    pub fn tray(&self) -> &Tray {
        &self.tray
    }

    pub fn dock(&self) -> &Dock {
        &self.dock
    }

    pub fn menu(&self) -> &AppMenu {
        &self.menu
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn update_tray(&mut self, patch: TrayPatch) {
        let presentation = self.tray.set_state(patch);
        self.backend.render_tray(presentation.as_ref());
    }

    pub fn update_dock(&mut self, patch: DockPatch) {
        let presentation = self.dock.set_state(patch, self.window.focused);
        self.backend.render_dock(&presentation);
    }

    pub fn update_menu(&mut self, patch: MenuPatch) {
        let presentation = self.menu.set_state(patch);
        self.backend.render_menu(&presentation);
    }

    pub fn set_window_visible(&mut self, visible: bool) {
        self.window.visible = visible;
        self.window.focused = visible;
        self.backend.window(if visible {
            WindowAction::Show
        } else {
            WindowAction::Hide
        });
        self.update_tray(TrayPatch {
            main_window_visible: Some(visible),
            ..Default::default()
        });
    }

    /// Bring the window up without stealing focus and flash it.
    pub fn show_inactive_and_flash(&mut self) {
        self.window.visible = true;
        self.backend.window(WindowAction::ShowInactive);
        self.backend.window(WindowAction::FlashFrame(true));
        self.update_tray(TrayPatch {
            main_window_visible: Some(true),
            ..Default::default()
        });
    }

    pub fn set_focused(&mut self, focused: bool) {
        let regained = focused && !self.window.focused;
        self.window.focused = focused;
        if regained {
            self.backend.window(WindowAction::FlashFrame(false));
        }
    }

    pub fn set_full_screen(&mut self, full_screen: bool) {
        self.window.full_screen = full_screen;
        self.backend.window(WindowAction::SetFullScreen(full_screen));
        self.update_menu(MenuPatch {
            show_full_screen: Some(full_screen),
            ..Default::default()
        });
    }

    pub fn set_hide_on_close(&mut self, hide_on_close: bool) {
        self.window.hide_on_close = hide_on_close;
    }
}
