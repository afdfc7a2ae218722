//! Application menu template, rebuilt from state on every change.

use super::command::{Preference, ShellCommand};
use super::Platform;

const DOCS_URL: &str = "https://rocket.chat/docs";
const ISSUES_URL: &str = "https://github.com/RocketChat/Rocket.Chat.Electron/issues/new";
const HOMEPAGE_URL: &str = "https://rocket.chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuServer {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub servers: Vec<MenuServer>,
    pub current_server: Option<String>,
    pub show_tray_icon: bool,
    pub show_user_status_in_tray: bool,
    pub show_full_screen: bool,
    pub show_menu_bar: bool,
    pub show_server_list: bool,
    pub show_window_on_unread_changed: bool,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            current_server: None,
            show_tray_icon: true,
            show_user_status_in_tray: true,
            show_full_screen: false,
            show_menu_bar: true,
            show_server_list: true,
            show_window_on_unread_changed: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuPatch {
    pub servers: Option<Vec<MenuServer>>,
    pub current_server: Option<Option<String>>,
    pub show_tray_icon: Option<bool>,
    pub show_user_status_in_tray: Option<bool>,
    pub show_full_screen: Option<bool>,
    pub show_menu_bar: Option<bool>,
    pub show_server_list: Option<bool>,
    pub show_window_on_unread_changed: Option<bool>,
}

/// Native editing and window roles the toolkit implements itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Hide,
    HideOthers,
    Unhide,
    Undo,
    Redo,
    Cut,
    Copy,
    Paste,
    SelectAll,
    ResetZoom,
    ZoomIn,
    ZoomOut,
    Minimize,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItem {
    Submenu {
        label: String,
        items: Vec<MenuItem>,
    },
    Command {
        label: String,
        accelerator: Option<String>,
        command: ShellCommand,
    },
    Checkbox {
        label: String,
        checked: bool,
        enabled: bool,
        command: ShellCommand,
    },
    Radio {
        label: String,
        checked: bool,
        accelerator: Option<String>,
        command: ShellCommand,
    },
    Role {
        role: Role,
        accelerator: Option<String>,
    },
    Separator,
}

impl MenuItem {
    fn command(label: &str, accelerator: Option<&str>, command: ShellCommand) -> Self {
        MenuItem::Command {
            label: label.to_string(),
            accelerator: accelerator.map(str::to_string),
            command,
        }
    }

    fn toggle(label: &str, checked: bool, preference: Preference) -> Self {
        MenuItem::Checkbox {
            label: label.to_string(),
            checked,
            enabled: true,
            command: ShellCommand::Toggle { preference },
        }
    }

    fn role(role: Role, accelerator: Option<&str>) -> Self {
        MenuItem::Role {
            role,
            accelerator: accelerator.map(str::to_string),
        }
    }

    fn submenu(label: &str, items: Vec<MenuItem>) -> Self {
        MenuItem::Submenu {
            label: label.to_string(),
            items,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            MenuItem::Submenu { label, .. }
            | MenuItem::Command { label, .. }
            | MenuItem::Checkbox { label, .. }
            | MenuItem::Radio { label, .. } => Some(label),
            MenuItem::Role { .. } | MenuItem::Separator => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPresentation {
    pub template: Vec<MenuItem>,
    /// Window menu bar visibility; macOS has a global menu bar instead.
    pub menu_bar_visible: Option<bool>,
}

impl MenuPresentation {
    /// Every actionable item, depth first, with its label.
    pub fn commands(&self) -> Vec<(&str, &ShellCommand)> {
        fn walk<'a>(items: &'a [MenuItem], out: &mut Vec<(&'a str, &'a ShellCommand)>) {
            for item in items {
                match item {
                    MenuItem::Submenu { items, .. } => walk(items, out),
                    MenuItem::Command { label, command, .. }
                    | MenuItem::Checkbox { label, command, .. }
                    | MenuItem::Radio { label, command, .. } => out.push((label, command)),
                    MenuItem::Role { .. } | MenuItem::Separator => {}
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.template, &mut out);
        out
    }
}

pub struct AppMenu {
    platform: Platform,
    app_name: String,
    state: MenuState,
}

impl AppMenu {
    pub fn new(platform: Platform, app_name: impl Into<String>) -> Self {
        Self {
            platform,
            app_name: app_name.into(),
            state: MenuState::default(),
        }
    }

    pub fn state(&self) -> &MenuState {
        &self.state
    }

    pub fn set_state(&mut self, patch: MenuPatch) -> MenuPresentation {
        let s = &mut self.state;
        if let Some(servers) = patch.servers {
            s.servers = servers;
        }
        if let Some(current) = patch.current_server {
            s.current_server = current;
        }
        if let Some(v) = patch.show_tray_icon {
            s.show_tray_icon = v;
        }
        if let Some(v) = patch.show_user_status_in_tray {
            s.show_user_status_in_tray = v;
        }
        if let Some(v) = patch.show_full_screen {
            s.show_full_screen = v;
        }
        if let Some(v) = patch.show_menu_bar {
            s.show_menu_bar = v;
        }
        if let Some(v) = patch.show_server_list {
            s.show_server_list = v;
        }
        if let Some(v) = patch.show_window_on_unread_changed {
            s.show_window_on_unread_changed = v;
        }
        self.presentation()
    }

    pub fn presentation(&self) -> MenuPresentation {
        let mac = self.platform == Platform::MacOs;
        MenuPresentation {
            template: vec![
                self.app_submenu(),
                self.edit_submenu(),
                self.view_submenu(),
                self.window_submenu(),
                self.help_submenu(),
            ],
            menu_bar_visible: (!mac).then_some(self.state.show_menu_bar),
        }
    }

    fn app_submenu(&self) -> MenuItem {
        let mac = self.platform == Platform::MacOs;
        let mut items = Vec::new();
        if mac {
            items.push(MenuItem::command(
                &format!("About {}", self.app_name),
                None,
                ShellCommand::About,
            ));
            items.push(MenuItem::Separator);
            items.push(MenuItem::role(Role::Hide, Some("Command+H")));
            items.push(MenuItem::role(Role::HideOthers, Some("Command+Alt+H")));
            items.push(MenuItem::role(Role::Unhide, None));
            items.push(MenuItem::Separator);
        } else {
            items.push(MenuItem::command(
                "Add new server",
                Some("CommandOrControl+N"),
                ShellCommand::AddNewServer,
            ));
        }
        items.push(MenuItem::Separator);
        items.push(MenuItem::command(
            &format!("Quit {}", self.app_name),
            Some("CommandOrControl+Q"),
            ShellCommand::Quit,
        ));

        let label = if mac { self.app_name.as_str() } else { "File" };
        MenuItem::submenu(label, items)
    }

    fn edit_submenu(&self) -> MenuItem {
        let redo = if self.platform == Platform::Windows {
            "Control+Y"
        } else {
            "CommandOrControl+Shift+Z"
        };
        MenuItem::submenu(
            "Edit",
            vec![
                MenuItem::role(Role::Undo, Some("CommandOrControl+Z")),
                MenuItem::role(Role::Redo, Some(redo)),
                MenuItem::Separator,
                MenuItem::role(Role::Cut, Some("CommandOrControl+X")),
                MenuItem::role(Role::Copy, Some("CommandOrControl+C")),
                MenuItem::role(Role::Paste, Some("CommandOrControl+V")),
                MenuItem::role(Role::SelectAll, Some("CommandOrControl+A")),
            ],
        )
    }

    fn view_submenu(&self) -> MenuItem {
        let mac = self.platform == Platform::MacOs;
        let s = &self.state;
        let mut items = vec![
            MenuItem::command(
                "Reload",
                Some("CommandOrControl+R"),
                ShellCommand::ReloadServer {
                    ignoring_cache: false,
                    clear_certificates: false,
                },
            ),
            MenuItem::command(
                "Reload ignoring cache",
                None,
                ShellCommand::ReloadServer {
                    ignoring_cache: true,
                    clear_certificates: false,
                },
            ),
            MenuItem::command(
                "Clear trusted certificates",
                None,
                ShellCommand::ReloadServer {
                    ignoring_cache: true,
                    clear_certificates: true,
                },
            ),
            MenuItem::Separator,
            MenuItem::command(
                "Back",
                Some(if mac { "Command+[" } else { "Alt+Left" }),
                ShellCommand::GoBack,
            ),
            MenuItem::command(
                "Forward",
                Some(if mac { "Command+]" } else { "Alt+Right" }),
                ShellCommand::GoForward,
            ),
            MenuItem::Separator,
            MenuItem::toggle("Tray icon", s.show_tray_icon, Preference::ShowTrayIcon),
            MenuItem::Checkbox {
                label: "User status in tray".to_string(),
                checked: s.show_tray_icon && s.show_user_status_in_tray,
                enabled: s.show_tray_icon,
                command: ShellCommand::Toggle {
                    preference: Preference::ShowUserStatusInTray,
                },
            },
        ];
        if mac {
            items.push(MenuItem::toggle(
                "Full screen",
                s.show_full_screen,
                Preference::ShowFullScreen,
            ));
        } else {
            items.push(MenuItem::toggle("Menu bar", s.show_menu_bar, Preference::ShowMenuBar));
        }
        items.push(MenuItem::toggle(
            "Server list",
            s.show_server_list,
            Preference::ShowServerList,
        ));
        items.push(MenuItem::Separator);
        items.push(MenuItem::role(Role::ResetZoom, Some("CommandOrControl+0")));
        items.push(MenuItem::role(Role::ZoomIn, Some("CommandOrControl+Plus")));
        items.push(MenuItem::role(Role::ZoomOut, Some("CommandOrControl+-")));

        MenuItem::submenu("View", items)
    }

    fn window_submenu(&self) -> MenuItem {
        let s = &self.state;
        let mut items = Vec::new();
        if self.platform == Platform::MacOs {
            items.push(MenuItem::command(
                "Add new server",
                Some("CommandOrControl+N"),
                ShellCommand::AddNewServer,
            ));
            items.push(MenuItem::Separator);
        }

        for (i, server) in s.servers.iter().enumerate() {
            let label = server.title.replace('&', "&&");
            let accelerator = Some(format!("CommandOrControl+{}", i + 1));
            let command = ShellCommand::SelectServer {
                url: server.url.clone(),
            };
            // Radio semantics only make sense while something is selected.
            items.push(match &s.current_server {
                Some(current) => MenuItem::Radio {
                    label,
                    checked: *current == server.url,
                    accelerator,
                    command,
                },
                None => MenuItem::Command {
                    label,
                    accelerator,
                    command,
                },
            });
        }

        items.push(MenuItem::Separator);
        items.push(MenuItem::toggle(
            "Show on unread messages",
            s.show_window_on_unread_changed,
            Preference::ShowWindowOnUnreadChanged,
        ));
        items.push(MenuItem::Separator);
        items.push(MenuItem::role(Role::Minimize, Some("CommandOrControl+M")));
        items.push(MenuItem::role(Role::Close, Some("CommandOrControl+W")));

        MenuItem::submenu("Window", items)
    }

    fn help_submenu(&self) -> MenuItem {
        let mut items = vec![
            MenuItem::command(
                "Documentation",
                None,
                ShellCommand::OpenUrl {
                    url: DOCS_URL.to_string(),
                },
            ),
            MenuItem::Separator,
            MenuItem::command(
                "Report issue",
                None,
                ShellCommand::OpenUrl {
                    url: ISSUES_URL.to_string(),
                },
            ),
            MenuItem::command("Reset app data", None, ShellCommand::ResetAppData),
            MenuItem::Separator,
            MenuItem::command(
                "Learn more",
                None,
                ShellCommand::OpenUrl {
                    url: HOMEPAGE_URL.to_string(),
                },
            ),
        ];
        if self.platform != Platform::MacOs {
            items.push(MenuItem::command(
                &format!("About {}", self.app_name),
                None,
                ShellCommand::About,
            ));
        }
        MenuItem::submenu("Help", items)
    }
}
