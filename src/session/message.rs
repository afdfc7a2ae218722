//! Typed vocabulary of the host-scoped channel.

use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::sidebar::{Badge, SidebarStyle};
use crate::trust::Certificate;

/// Messages a server page sends to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    TitleChanged(String),
    UnreadChanged {
        badge: Option<Badge>,
        /// The page reported a plain number rather than a marker.
        numeric: bool,
    },
    Focus,
    GetSourceId,
    ReloadServer,
    SidebarBackground(SidebarStyle),
    UserStatusManuallySet(String),
}

impl HostMessage {
    /// Decode a raw `(channel, args)` pair. Unknown channels and malformed
    /// arguments yield `None`.
    pub fn from_ipc(channel: &str, args: &[Value]) -> Option<Self> {
        let first = args.first();
        let message = match channel {
            "title-changed" => HostMessage::TitleChanged(first?.as_str()?.to_string()),
            "unread-changed" => HostMessage::UnreadChanged {
                badge: Badge::from_json(first),
                numeric: first.is_some_and(Value::is_number),
            },
            "focus" => HostMessage::Focus,
            "get-sourceId" => HostMessage::GetSourceId,
            "reload-server" => HostMessage::ReloadServer,
            "sidebar-background" => {
                HostMessage::SidebarBackground(serde_json::from_value(first?.clone()).ok()?)
            }
            "user-status-manually-set" => {
                HostMessage::UserStatusManuallySet(first?.as_str()?.to_string())
            }
            other => {
                tracing::debug!(channel = %other, "Ignoring unknown host message");
                return None;
            }
        };
        Some(message)
    }
}

/// Messages the shell sends into a server page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererMessage {
    RequestSidebarColor,
    /// A certificate for `url` was just trusted; retry it.
    CertificateReload(String),
    ScreenshareResult(String),
}

impl RendererMessage {
    pub fn channel(&self) -> &'static str {
        match self {
            RendererMessage::RequestSidebarColor => "request-sidebar-color",
            RendererMessage::CertificateReload(_) => "certificate-reload",
            RendererMessage::ScreenshareResult(_) => "screenshare-result",
        }
    }
}

/// Everything a browsing context reports, in emission order.
#[derive(Debug)]
pub enum ContextEvent {
    DomReady,
    NavigatedInPage { url: String },
    LoadFailed {
        url: String,
        main_frame: bool,
        error: String,
    },
    ResponseReceived {
        url: String,
        main_frame: bool,
        status: u16,
    },
    Message(HostMessage),
    CertificateError {
        url: String,
        certificate: Certificate,
        error: String,
        respond: oneshot::Sender<bool>,
    },
    LinkClicked { href: String, download: bool },
    /// The server answered `url` with an HTTP auth challenge. `None` on
    /// `respond` (or dropping it) leaves the challenge unanswered.
    LoginRequested {
        url: String,
        respond: oneshot::Sender<Option<(String, SecretString)>>,
    },
}

/// A context event tagged with the host it came from.
#[derive(Debug)]
pub struct ContextEnvelope {
    pub host: String,
    pub event: ContextEvent,
}
