//! Shared fakes for the integration tests.
//!
//! `Harness` wires a real `App` to a recording browsing-context factory, a
//! recording chrome backend and dialogs with scripted answers.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;

use chatdeck::app::{Action, App, AppDeps, AppEvent, AppNotice, Dialogs};
use chatdeck::config::Config;
use chatdeck::registry::{Host, Registry};
use chatdeck::session::{
    BrowsingContext, ContextEnvelope, ContextEvent, ContextFactory, HostChannel, RendererMessage,
};
use chatdeck::shell::{
    ChromeBackend, DockPresentation, MenuPresentation, Platform, TrayPresentation, WindowAction,
};
use chatdeck::storage::Store;
use chatdeck::trust::{CertificatePrompt, TrustStore};

// ============================================================================
// Browsing contexts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Reload(bool),
    Send(RendererMessage),
    Back,
    Forward,
    Focus,
    Visible(bool),
    Destroy,
}

pub type CallLog = Arc<Mutex<Vec<(String, Call)>>>;

struct RecordingContext {
    host: String,
    log: CallLog,
}

impl RecordingContext {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().push((self.host.clone(), call));
    }
}

impl BrowsingContext for RecordingContext {
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

struct RecordingFactory {
    log: CallLog,
}

impl ContextFactory for RecordingFactory {
    fn create(&mut self, host: &Host, _channel: HostChannel) -> Box<dyn BrowsingContext> {
        Box::new(RecordingContext {
            host: host.url.clone(),
            log: self.log.clone(),
        })
    }
}

// ============================================================================
// Chrome backend
// ============================================================================

#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub windows: Arc<Mutex<Vec<WindowAction>>>,
    pub trays: Arc<Mutex<Vec<Option<TrayPresentation>>>>,
    pub docks: Arc<Mutex<Vec<DockPresentation>>>,
}

impl ChromeBackend for RecordingBackend {
    fn render_tray(&mut self, tray: Option<&TrayPresentation>) {
        self.trays.lock().unwrap().push(tray.cloned());
    }
    fn render_dock(&mut self, dock: &DockPresentation) {
        self.docks.lock().unwrap().push(dock.clone());
    }
    fn render_menu(&mut self, _menu: &MenuPresentation) {}
    fn window(&mut self, action: WindowAction) {
        self.windows.lock().unwrap().push(action);
    }
}

// ============================================================================
// Dialogs
// ============================================================================

#[derive(Debug, Default)]
pub struct Script {
    pub add_host: bool,
    pub certificate: bool,
    pub reset: bool,
    pub screenshare: Option<String>,
}

#[derive(Debug, Default)]
pub struct Asked {
    pub add_host: Vec<String>,
    pub certificates: Vec<CertificatePrompt>,
    pub alerts: Vec<(String, String)>,
    pub resets: usize,
}

#[derive(Default)]
pub struct ScriptedDialogs {
    pub script: Mutex<Script>,
    pub asked: Mutex<Asked>,
}

impl Dialogs for ScriptedDialogs {
    fn confirm_add_host(&self, url: &str) -> BoxFuture<'static, bool> {
        self.asked.lock().unwrap().add_host.push(url.to_string());
        futures::future::ready(self.script.lock().unwrap().add_host).boxed()
    }

    fn confirm_certificate(&self, prompt: &CertificatePrompt) -> BoxFuture<'static, bool> {
        self.asked.lock().unwrap().certificates.push(prompt.clone());
        futures::future::ready(self.script.lock().unwrap().certificate).boxed()
    }

    fn confirm_reset(&self) -> BoxFuture<'static, bool> {
        self.asked.lock().unwrap().resets += 1;
        futures::future::ready(self.script.lock().unwrap().reset).boxed()
    }

    fn select_screenshare_source(&self) -> BoxFuture<'static, Option<String>> {
        futures::future::ready(self.script.lock().unwrap().screenshare.clone()).boxed()
    }

    fn alert(&self, title: &str, message: &str) {
        self.asked
            .lock()
            .unwrap()
            .alerts
            .push((title.to_string(), message.to_string()));
    }

    fn about(&self, _product_name: &str) {}
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub app: App,
    pub store: Store,
    pub log: CallLog,
    pub backend: RecordingBackend,
    pub dialogs: Arc<ScriptedDialogs>,
    events: mpsc::Receiver<AppEvent>,
    notices: mpsc::UnboundedReceiver<AppNotice>,
    _contexts: mpsc::UnboundedReceiver<ContextEnvelope>,
}

impl Harness {
    pub fn new(store: Store, config: Config) -> Self {
        let log = CallLog::default();
        let backend = RecordingBackend::default();
        let dialogs = Arc::new(ScriptedDialogs::default());
        let registry = Registry::load(store.clone(), &config);

        let (event_tx, events) = mpsc::channel(32);
        let (context_tx, contexts) = mpsc::unbounded_channel();

        let deps = AppDeps {
            store: store.clone(),
            registry,
            trust: TrustStore::in_memory(),
            http_client: reqwest::Client::new(),
            factory: Box::new(RecordingFactory { log: log.clone() }),
            backend: Box::new(backend.clone()),
            dialogs: dialogs.clone(),
            platform: Platform::Linux,
        };
        let mut app = App::new(config, deps, event_tx, context_tx);
        let notices = app.subscribe_notices();

        Self {
            app,
            store,
            log,
            backend,
            dialogs,
            events,
            notices,
            _contexts: contexts,
        }
    }

    /// A started app whose registry holds `urls`, in order.
    pub fn with_hosts(urls: &[&str], config: Config) -> Self {
        let store = Store::in_memory();
        store
            .set_json(chatdeck::registry::HOSTS_KEY, urls)
            .unwrap();
        let mut harness = Self::new(store, config);
        harness.app.start();
        harness
    }

    /// Wait for the next background event and feed it to the app.
    pub async fn settle(&mut self) -> Action {
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for a background event")
            .expect("event channel closed");
        self.app.handle_app_event(event)
    }

    pub fn context_event(&mut self, host: &str, event: ContextEvent) {
        self.app.handle_context_event(ContextEnvelope {
            host: host.to_string(),
            event,
        });
    }

    pub fn notices(&mut self) -> Vec<AppNotice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }

    pub fn calls(&self) -> Vec<(String, Call)> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

pub fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("chatdeck_{}_test", name));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
