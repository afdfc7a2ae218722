//! Lifecycle of per-host browsing contexts and routing of their events.
//!
//! Each registry host gets at most one context, created lazily by
//! [`SessionManager::ensure`] and torn down by [`SessionManager::remove`].
//! At most one context is active (visible) at a time. Context events arrive
//! on one multiplexed channel tagged by host; [`SessionManager::handle`]
//! settles what concerns the context itself and hands everything else back
//! as a typed [`SessionAction`] for the orchestrator to apply.

mod context;
mod headless;
mod links;
mod message;

use std::collections::HashMap;

use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};

use crate::events::Emitter;
use crate::registry::{is_under, Host};
use crate::sidebar::{Badge, SidebarStyle};
use crate::trust::Certificate;

pub use context::{BrowsingContext, ContextFactory, HostChannel};
pub use headless::{HeadlessContext, HeadlessFactory};
pub use links::{classify as classify_link, LinkAction};
pub use message::{ContextEnvelope, ContextEvent, HostMessage, RendererMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created(String),
    Ready(String),
    Activated(String),
    Deactivated,
    FallbackShown { url: String, reason: String },
    Destroyed(String),
}

/// Work a context event asks of components other than the session manager.
#[derive(Debug)]
pub enum SessionAction {
    /// The context finished loading its document.
    Ready { url: String },
    SetTitle { url: String, title: String },
    SetBadge {
        url: String,
        badge: Option<Badge>,
        numeric: bool,
    },
    Focus { url: String },
    OpenScreenshare { url: String },
    SidebarStyle(SidebarStyle),
    UserStatus(String),
    SaveLastPath { url: String, path: String },
    CertificateError {
        url: String,
        certificate: Certificate,
        error: String,
        respond: oneshot::Sender<bool>,
    },
    Link(LinkAction),
    LoginRequested {
        url: String,
        respond: oneshot::Sender<Option<(String, SecretString)>>,
    },
}

struct Session {
    server_url: String,
    context: Box<dyn BrowsingContext>,
    phase: Phase,
    showing_fallback: bool,
    badge: Option<Badge>,
}

pub struct SessionManager {
    factory: Box<dyn ContextFactory>,
    fallback_page: String,
    tx: mpsc::UnboundedSender<ContextEnvelope>,
    sessions: HashMap<String, Session>,
    active: Option<String>,
    events: Emitter<SessionEvent>,
}

impl SessionManager {
    /// Create a manager whose contexts report on `tx`.
    pub fn new(
        factory: Box<dyn ContextFactory>,
        fallback_page: impl Into<String>,
        tx: mpsc::UnboundedSender<ContextEnvelope>,
    ) -> Self {
        Self {
            factory,
            fallback_page: fallback_page.into(),
            tx,
            sessions: HashMap::new(),
            active: None,
            events: Emitter::new(),
        }
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Create the context for `host` unless it already exists.
    ///
    /// A new context starts at the host's last path, or its URL.
    pub fn ensure(&mut self, host: &Host) -> bool {
        if self.sessions.contains_key(&host.url) {
            return false;
        }

        let channel = HostChannel::new(host.url.clone(), self.tx.clone());
        let mut context = self.factory.create(host, channel);
        context.set_visible(false);
        context.load(host.start_url());

        self.sessions.insert(
            host.url.clone(),
            Session {
                server_url: host.url.clone(),
                context,
                phase: Phase::Created,
                showing_fallback: false,
                badge: None,
            },
        );
        tracing::debug!(url = %host.url, "Created browsing context");
        self.events.emit(SessionEvent::Created(host.url.clone()));
        true
    }

    /// Destroy the context for `url`.
    pub fn remove(&mut self, url: &str) -> bool {
        let Some(mut session) = self.sessions.remove(url) else {
            return false;
        };
        session.context.destroy();
        if self.active.as_deref() == Some(url) {
            self.active = None;
        }
        tracing::debug!(url = %url, "Destroyed browsing context");
        self.events.emit(SessionEvent::Destroyed(url.to_string()));
        true
    }

    /// Show the context for `url` and focus it.
    ///
    /// Already active → no-op; unknown → ignored. Returns whether the active
    /// context changed.
    pub fn activate(&mut self, url: &str) -> bool {
        if self.active.as_deref() == Some(url) {
            return false;
        }
        if !self.sessions.contains_key(url) {
            tracing::debug!(url = %url, "Activation of unknown context ignored");
            return false;
        }

        self.hide_active();
        self.active = Some(url.to_string());
        if let Some(session) = self.sessions.get_mut(url) {
            session.context.set_visible(true);
            if session.phase == Phase::Ready {
                session.context.send(RendererMessage::RequestSidebarColor);
            }
        }
        self.focus_active();
        self.events.emit(SessionEvent::Activated(url.to_string()));
        true
    }

    /// Hide the active context, leaving none active (landing view).
    pub fn deactivate_all(&mut self) {
        if self.active.is_none() {
            return;
        }
        self.hide_active();
        self.events.emit(SessionEvent::Deactivated);
    }

    fn hide_active(&mut self) {
        if let Some(previous) = self.active.take() {
            if let Some(session) = self.sessions.get_mut(&previous) {
                session.context.set_visible(false);
            }
        }
    }

    pub fn focus_active(&mut self) -> bool {
        match self.active_session_mut() {
            Some(session) => {
                session.context.focus();
                true
            }
            None => false,
        }
    }

    pub fn reload_active(&mut self, ignoring_cache: bool) -> bool {
        match self.active_session_mut() {
            Some(session) => {
                session.context.reload(ignoring_cache);
                true
            }
            None => false,
        }
    }

    pub fn reload_host(&mut self, url: &str) -> bool {
        match self.sessions.get_mut(url) {
            Some(session) => {
                session.context.reload(false);
                true
            }
            None => false,
        }
    }

    pub fn go_back(&mut self) -> bool {
        match self.active_session_mut() {
            Some(session) => {
                session.context.go_back();
                true
            }
            None => false,
        }
    }

    pub fn go_forward(&mut self) -> bool {
        match self.active_session_mut() {
            Some(session) => {
                session.context.go_forward();
                true
            }
            None => false,
        }
    }

    pub fn send_to_active(&mut self, message: RendererMessage) -> bool {
        match self.active_session_mut() {
            Some(session) => {
                session.context.send(message);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.sessions.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn phase(&self, url: &str) -> Option<Phase> {
        self.sessions.get(url).map(|s| s.phase)
    }

    pub fn is_showing_fallback(&self, url: &str) -> bool {
        self.sessions.get(url).is_some_and(|s| s.showing_fallback)
    }

    pub fn badge(&self, url: &str) -> Option<Badge> {
        self.sessions.get(url).and_then(|s| s.badge)
    }

    fn active_session_mut(&mut self) -> Option<&mut Session> {
        let active = self.active.as_deref()?;
        self.sessions.get_mut(active)
    }

    /// Route one context event.
    ///
    /// Events from contexts that no longer exist are dropped; a dropped
    /// certificate responder reads as a rejection.
    pub fn handle(&mut self, envelope: ContextEnvelope) -> Option<SessionAction> {
        let ContextEnvelope { host, event } = envelope;
        let is_active = self.active.as_deref() == Some(host.as_str());
        let Some(session) = self.sessions.get_mut(&host) else {
            tracing::debug!(url = %host, "Event from destroyed context dropped");
            return None;
        };

        match event {
            ContextEvent::DomReady => {
                session.phase = Phase::Ready;
                if is_active {
                    session.context.send(RendererMessage::RequestSidebarColor);
                }
                self.events.emit(SessionEvent::Ready(host.clone()));
                Some(SessionAction::Ready { url: host })
            }
            ContextEvent::NavigatedInPage { url } => {
                if is_under(&session.server_url, &url) {
                    Some(SessionAction::SaveLastPath { url: host, path: url })
                } else {
                    None
                }
            }
            ContextEvent::LoadFailed {
                url,
                main_frame: true,
                error,
            } => {
                if url == self.fallback_page {
                    tracing::error!(url = %host, error = %error, "Fallback page failed to load");
                    return None;
                }
                tracing::warn!(url = %host, failed = %url, error = %error, "Main frame failed to load");
                self.show_fallback(&host, error);
                None
            }
            ContextEvent::ResponseReceived {
                url,
                main_frame: true,
                status,
            } if status >= 500 && url != self.fallback_page => {
                tracing::warn!(url = %host, status, "Server error on main frame");
                self.show_fallback(&host, format!("HTTP {}", status));
                None
            }
            ContextEvent::ResponseReceived {
                url,
                main_frame: true,
                ..
            } => {
                if url != self.fallback_page {
                    session.showing_fallback = false;
                }
                None
            }
            ContextEvent::LoadFailed { .. } | ContextEvent::ResponseReceived { .. } => None,
            ContextEvent::Message(message) => self.route_message(host, message),
            ContextEvent::CertificateError {
                url,
                certificate,
                error,
                respond,
            } => Some(SessionAction::CertificateError {
                url,
                certificate,
                error,
                respond,
            }),
            ContextEvent::LinkClicked { href, download } => {
                match links::classify(&href, download, &session.server_url) {
                    LinkAction::Stay => {
                        session.context.load(&resolve_href(&session.server_url, &href));
                        None
                    }
                    action => Some(SessionAction::Link(action)),
                }
            }
            ContextEvent::LoginRequested { url, respond } => {
                Some(SessionAction::LoginRequested { url, respond })
            }
        }
    }

    fn route_message(&mut self, host: String, message: HostMessage) -> Option<SessionAction> {
        match message {
            HostMessage::TitleChanged(title) => Some(SessionAction::SetTitle { url: host, title }),
            HostMessage::UnreadChanged { badge, numeric } => {
                if let Some(session) = self.sessions.get_mut(&host) {
                    session.badge = badge;
                }
                Some(SessionAction::SetBadge {
                    url: host,
                    badge,
                    numeric,
                })
            }
            HostMessage::Focus => Some(SessionAction::Focus { url: host }),
            HostMessage::GetSourceId => Some(SessionAction::OpenScreenshare { url: host }),
            HostMessage::ReloadServer => {
                // Reloads the active context at its server root, whoever asked.
                if let Some(session) = self.active_session_mut() {
                    let server_url = session.server_url.clone();
                    session.showing_fallback = false;
                    session.context.load(&server_url);
                }
                None
            }
            HostMessage::SidebarBackground(style) => Some(SessionAction::SidebarStyle(style)),
            HostMessage::UserStatusManuallySet(status) => Some(SessionAction::UserStatus(status)),
        }
    }

    fn show_fallback(&mut self, url: &str, reason: String) {
        let fallback = self.fallback_page.clone();
        if let Some(session) = self.sessions.get_mut(url) {
            session.showing_fallback = true;
            session.context.load(&fallback);
        }
        self.events.emit(SessionEvent::FallbackShown {
            url: url.to_string(),
            reason,
        });
    }
}

/// Absolute URL for a link that stays inside the context.
fn resolve_href(site_url: &str, href: &str) -> String {
    url::Url::parse(site_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Load(String),
        Reload(bool),
        Send(RendererMessage),
        Back,
        Forward,
        Focus,
        Visible(bool),
        Destroy,
    }

    type Log = Arc<Mutex<Vec<(String, Call)>>>;

    struct FakeContext {
        host: String,
        log: Log,
    }

    impl FakeContext {
        fn record(&self, call: Call) {
            self.log.lock().unwrap().push((self.host.clone(), call));
        }
    }

    impl BrowsingContext for FakeContext {
        fn load(&mut self, url: &str) {
            self.record(Call::Load(url.to_string()));
        }
        fn reload(&mut self, ignoring_cache: bool) {
            self.record(Call::Reload(ignoring_cache));
        }
        fn send(&mut self, message: RendererMessage) {
            self.record(Call::Send(message));
        }
        fn go_back(&mut self) {
            self.record(Call::Back);
        }
        fn go_forward(&mut self) {
            self.record(Call::Forward);
        }
        fn focus(&mut self) {
            self.record(Call::Focus);
        }
        fn set_visible(&mut self, visible: bool) {
            self.record(Call::Visible(visible));
        }
        fn current_url(&self) -> Option<String> {
            None
        }
        fn destroy(&mut self) {
            self.record(Call::Destroy);
        }
    }

    struct FakeFactory {
        log: Log,
    }

    impl ContextFactory for FakeFactory {
        fn create(&mut self, host: &Host, _channel: HostChannel) -> Box<dyn BrowsingContext> {
            Box::new(FakeContext {
                host: host.url.clone(),
                log: self.log.clone(),
            })
        }
    }

    const FALLBACK: &str = "chatdeck://loading-error";

    fn manager() -> (SessionManager, Log) {
        let log: Log = Arc::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let manager = SessionManager::new(Box::new(FakeFactory { log: log.clone() }), FALLBACK, tx);
        (manager, log)
    }

    fn take(log: &Log) -> Vec<(String, Call)> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    fn envelope(host: &str, event: ContextEvent) -> ContextEnvelope {
        ContextEnvelope {
            host: host.to_string(),
            event,
        }
    }

    const A: &str = "https://a.example.com";
    const B: &str = "https://b.example.com";

    #[test]
    fn test_ensure_is_idempotent_and_resumes_last_path() {
        let (mut manager, log) = manager();
        let mut host = Host::new(A);
        host.last_path = Some(format!("{}/channel/general", A));

        assert!(manager.ensure(&host));
        assert!(!manager.ensure(&host));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.phase(A), Some(Phase::Created));
        assert_eq!(
            take(&log),
            vec![
                (A.to_string(), Call::Visible(false)),
                (A.to_string(), Call::Load(format!("{}/channel/general", A))),
            ]
        );
    }

    #[test]
    fn test_activate_is_exclusive() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        manager.ensure(&Host::new(B));
        take(&log);

        assert!(manager.activate(A));
        assert!(!manager.activate(A));
        assert!(manager.activate(B));
        assert_eq!(manager.active(), Some(B));

        assert_eq!(
            take(&log),
            vec![
                (A.to_string(), Call::Visible(true)),
                (A.to_string(), Call::Focus),
                (A.to_string(), Call::Visible(false)),
                (B.to_string(), Call::Visible(true)),
                (B.to_string(), Call::Focus),
            ]
        );
    }

    #[test]
    fn test_activate_unknown_is_ignored() {
        let (mut manager, _log) = manager();
        manager.ensure(&Host::new(A));
        manager.activate(A);
        assert!(!manager.activate("https://nope.example.com"));
        assert_eq!(manager.active(), Some(A));
    }

    #[test]
    fn test_remove_destroys_and_clears_active() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        manager.activate(A);
        take(&log);

        assert!(manager.remove(A));
        assert_eq!(manager.active(), None);
        assert_eq!(take(&log), vec![(A.to_string(), Call::Destroy)]);
        assert!(manager.handle(envelope(A, ContextEvent::DomReady)).is_none());
    }

    #[test]
    fn test_dom_ready_marks_ready_and_requests_color_when_active() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        manager.activate(A);
        take(&log);

        let action = manager.handle(envelope(A, ContextEvent::DomReady));
        assert!(matches!(action, Some(SessionAction::Ready { ref url }) if url == A));
        assert_eq!(manager.phase(A), Some(Phase::Ready));
        assert_eq!(
            take(&log),
            vec![(A.to_string(), Call::Send(RendererMessage::RequestSidebarColor))]
        );
    }

    #[test]
    fn test_main_frame_failure_shows_fallback() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        take(&log);

        manager.handle(envelope(
            A,
            ContextEvent::LoadFailed {
                url: A.to_string(),
                main_frame: true,
                error: "ERR_CONNECTION_REFUSED".into(),
            },
        ));
        assert!(manager.is_showing_fallback(A));
        assert!(manager.contains(A));
        assert_eq!(take(&log), vec![(A.to_string(), Call::Load(FALLBACK.to_string()))]);
    }

    #[test]
    fn test_server_error_shows_fallback_but_subresource_does_not() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        take(&log);

        manager.handle(envelope(
            A,
            ContextEvent::ResponseReceived {
                url: format!("{}/sockjs/info", A),
                main_frame: false,
                status: 502,
            },
        ));
        manager.handle(envelope(
            A,
            ContextEvent::LoadFailed {
                url: format!("{}/x.png", A),
                main_frame: false,
                error: "404".into(),
            },
        ));
        assert!(!manager.is_showing_fallback(A));

        manager.handle(envelope(
            A,
            ContextEvent::ResponseReceived {
                url: A.to_string(),
                main_frame: true,
                status: 503,
            },
        ));
        assert!(manager.is_showing_fallback(A));
        assert_eq!(take(&log), vec![(A.to_string(), Call::Load(FALLBACK.to_string()))]);

        manager.handle(envelope(
            A,
            ContextEvent::ResponseReceived {
                url: A.to_string(),
                main_frame: true,
                status: 200,
            },
        ));
        assert!(!manager.is_showing_fallback(A));
    }

    #[test]
    fn test_fallback_page_failure_does_not_loop() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        take(&log);

        manager.handle(envelope(
            A,
            ContextEvent::LoadFailed {
                url: FALLBACK.to_string(),
                main_frame: true,
                error: "missing".into(),
            },
        ));
        assert!(take(&log).is_empty());
    }

    #[test]
    fn test_in_origin_navigation_saves_last_path() {
        let (mut manager, _log) = manager();
        manager.ensure(&Host::new(A));

        let action = manager.handle(envelope(
            A,
            ContextEvent::NavigatedInPage {
                url: format!("{}/direct/bob", A),
            },
        ));
        assert!(matches!(
            action,
            Some(SessionAction::SaveLastPath { ref url, ref path })
                if url == A && path == "https://a.example.com/direct/bob"
        ));

        let foreign = manager.handle(envelope(
            A,
            ContextEvent::NavigatedInPage {
                url: "https://elsewhere.example.org/".into(),
            },
        ));
        assert!(foreign.is_none());

        let lookalike = manager.handle(envelope(
            A,
            ContextEvent::NavigatedInPage {
                url: format!("{}.evil.net/direct/bob", A),
            },
        ));
        assert!(lookalike.is_none());
    }

    #[test]
    fn test_messages_route_to_actions() {
        let (mut manager, _log) = manager();
        manager.ensure(&Host::new(A));

        let action = manager.handle(envelope(
            A,
            ContextEvent::Message(HostMessage::UnreadChanged {
                badge: Some(Badge::Count(2)),
                numeric: true,
            }),
        ));
        assert!(matches!(
            action,
            Some(SessionAction::SetBadge { badge: Some(Badge::Count(2)), numeric: true, .. })
        ));
        assert_eq!(manager.badge(A), Some(Badge::Count(2)));

        assert!(matches!(
            manager.handle(envelope(A, ContextEvent::Message(HostMessage::Focus))),
            Some(SessionAction::Focus { ref url }) if url == A
        ));
        assert!(matches!(
            manager.handle(envelope(
                A,
                ContextEvent::Message(HostMessage::TitleChanged("Acme".into()))
            )),
            Some(SessionAction::SetTitle { ref title, .. }) if title == "Acme"
        ));
    }

    #[test]
    fn test_reload_server_reloads_active_at_root() {
        let (mut manager, log) = manager();
        let mut host = Host::new(A);
        host.last_path = Some(format!("{}/deep/link", A));
        manager.ensure(&host);
        manager.ensure(&Host::new(B));
        manager.activate(A);
        take(&log);

        let action = manager.handle(envelope(B, ContextEvent::Message(HostMessage::ReloadServer)));
        assert!(action.is_none());
        assert_eq!(take(&log), vec![(A.to_string(), Call::Load(A.to_string()))]);
    }

    #[test]
    fn test_navigation_commands_target_active() {
        let (mut manager, log) = manager();
        assert!(!manager.go_back());
        assert!(!manager.reload_active(false));

        manager.ensure(&Host::new(A));
        manager.activate(A);
        take(&log);

        assert!(manager.go_back());
        assert!(manager.go_forward());
        assert!(manager.reload_active(true));
        assert!(manager.send_to_active(RendererMessage::ScreenshareResult("screen:1".into())));
        assert!(manager.reload_host(A));
        assert_eq!(
            take(&log),
            vec![
                (A.to_string(), Call::Back),
                (A.to_string(), Call::Forward),
                (A.to_string(), Call::Reload(true)),
                (
                    A.to_string(),
                    Call::Send(RendererMessage::ScreenshareResult("screen:1".into()))
                ),
                (A.to_string(), Call::Reload(false)),
            ]
        );
    }

    #[test]
    fn test_relative_link_stays_and_foreign_link_is_returned() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        take(&log);

        let stay = manager.handle(envelope(
            A,
            ContextEvent::LinkClicked {
                href: "/channel/random".into(),
                download: false,
            },
        ));
        assert!(stay.is_none());
        assert_eq!(
            take(&log),
            vec![(A.to_string(), Call::Load(format!("{}/channel/random", A)))]
        );

        let external = manager.handle(envelope(
            A,
            ContextEvent::LinkClicked {
                href: "https://example.org".into(),
                download: false,
            },
        ));
        assert!(matches!(
            external,
            Some(SessionAction::Link(LinkAction::OpenExternal(ref u))) if u == "https://example.org"
        ));
    }

    #[test]
    fn test_deactivate_all_hides_active() {
        let (mut manager, log) = manager();
        manager.ensure(&Host::new(A));
        manager.activate(A);
        take(&log);

        manager.deactivate_all();
        assert_eq!(manager.active(), None);
        assert_eq!(take(&log), vec![(A.to_string(), Call::Visible(false))]);
        assert!(!manager.focus_active());
    }
}
