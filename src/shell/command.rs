//! Named commands exchanged between OS chrome and the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::registry::ProbeError;

/// User-toggleable shell preferences, named as chrome reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preference {
    ShowTrayIcon,
    ShowUserStatusInTray,
    ShowFullScreen,
    ShowWindowOnUnreadChanged,
    ShowMenuBar,
    ShowServerList,
}

/// Fire-and-forget commands. Everything but `AddHost` flows from chrome to
/// the orchestrator; `AddHost` goes the other way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ShellCommand {
    Quit,
    About,
    SelectServer {
        url: String,
    },
    Toggle {
        preference: Preference,
    },
    GoBack,
    GoForward,
    #[serde(rename_all = "camelCase")]
    ReloadServer {
        #[serde(default)]
        ignoring_cache: bool,
        #[serde(default)]
        clear_certificates: bool,
    },
    AddNewServer,
    OpenUrl {
        url: String,
    },
    ResetAppData,
    SetMainWindowVisibility {
        visible: bool,
    },
    RemoveServer {
        url: String,
    },
    MoveServer {
        url: String,
        index: usize,
    },
    AddHost {
        url: String,
    },
}

/// Commands that expect an answer.
#[derive(Debug)]
pub enum ShellRequest {
    /// Reachability probe for a host URL.
    ValidateHost {
        url: String,
        reply: oneshot::Sender<Result<(), ProbeError>>,
    },
    /// Time since the user last interacted with the shell.
    IdleTime { reply: oneshot::Sender<Duration> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(ShellCommand::GoBack).unwrap(),
            json!({"command": "go-back"})
        );
        assert_eq!(
            serde_json::to_value(ShellCommand::Toggle {
                preference: Preference::ShowTrayIcon
            })
            .unwrap(),
            json!({"command": "toggle", "preference": "showTrayIcon"})
        );
        assert_eq!(
            serde_json::to_value(ShellCommand::ReloadServer {
                ignoring_cache: true,
                clear_certificates: true,
            })
            .unwrap(),
            json!({"command": "reload-server", "ignoringCache": true, "clearCertificates": true})
        );
    }

    #[test]
    fn test_reload_server_flags_default_to_false() {
        let command: ShellCommand =
            serde_json::from_value(json!({"command": "reload-server"})).unwrap();
        assert_eq!(
            command,
            ShellCommand::ReloadServer {
                ignoring_cache: false,
                clear_certificates: false,
            }
        );
    }

    #[test]
    fn test_decodes_chrome_commands() {
        let command: ShellCommand = serde_json::from_value(
            json!({"command": "select-server", "url": "https://chat.example.com"}),
        )
        .unwrap();
        assert_eq!(
            command,
            ShellCommand::SelectServer {
                url: "https://chat.example.com".into()
            }
        );

        let command: ShellCommand = serde_json::from_value(
            json!({"command": "set-main-window-visibility", "visible": false}),
        )
        .unwrap();
        assert_eq!(command, ShellCommand::SetMainWindowVisibility { visible: false });

        assert!(serde_json::from_value::<ShellCommand>(json!({"command": "reload-app"})).is_err());
    }
}
