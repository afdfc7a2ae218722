//! Browsing context that fetches pages over HTTP without rendering them.
//!
//! It reports the same event sequence a rendering engine would for the main
//! frame: a response, then DOM ready and the document title, or a load
//! failure. Loads are tagged with a generation so a slow response for a page
//! the user already navigated away from is discarded.
//!
//! An HTTP auth challenge is reported as [`ContextEvent::LoginRequested`];
//! credentials handed back are used for one retry of the same request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

use super::context::{BrowsingContext, ContextFactory, HostChannel};
use super::message::{ContextEvent, HostMessage, RendererMessage};
use crate::registry::Host;

/// Pages larger than this are truncated before title extraction.
const MAX_PAGE_SIZE: usize = 1024 * 1024;

pub struct HeadlessFactory {
    client: reqwest::Client,
    timeout: Duration,
}

impl HeadlessFactory {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

impl ContextFactory for HeadlessFactory {
    fn create(&mut self, _host: &Host, channel: HostChannel) -> Box<dyn BrowsingContext> {
        Box::new(HeadlessContext::new(self.client.clone(), channel, self.timeout))
    }
}

pub struct HeadlessContext {
    client: reqwest::Client,
    channel: HostChannel,
    timeout: Duration,
    history: Vec<String>,
    position: usize,
    generation: Arc<AtomicU64>,
    visible: bool,
    destroyed: bool,
}

impl HeadlessContext {
    pub fn new(client: reqwest::Client, channel: HostChannel, timeout: Duration) -> Self {
        Self {
            client,
            channel,
            timeout,
            history: Vec::new(),
            position: 0,
            generation: Arc::new(AtomicU64::new(0)),
            visible: false,
            destroyed: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn navigate(&mut self, url: String, ignoring_cache: bool) {
        if self.destroyed {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let task = PageLoad {
            client: self.client.clone(),
            channel: self.channel.clone(),
            timeout: self.timeout,
            generation: self.generation.clone(),
            expected: generation,
            ignoring_cache,
        };
        tokio::spawn(task.run(url));
    }
}

impl BrowsingContext for HeadlessContext {
    fn load(&mut self, url: &str) {
        if !self.history.is_empty() {
            self.history.truncate(self.position + 1);
        }
        self.history.push(url.to_string());
        self.position = self.history.len() - 1;
        self.navigate(url.to_string(), false);
    }

    fn reload(&mut self, ignoring_cache: bool) {
        if let Some(url) = self.current_url() {
            self.navigate(url, ignoring_cache);
        }
    }

    fn send(&mut self, message: RendererMessage) {
        match message {
            RendererMessage::CertificateReload(url) => self.load(&url),
            other => {
                tracing::debug!(host = %self.channel.host(), channel = other.channel(), "No page script to receive message");
            }
        }
    }

    fn go_back(&mut self) {
        if self.position > 0 {
            self.position -= 1;
            let url = self.history[self.position].clone();
            self.navigate(url, false);
        }
    }

    fn go_forward(&mut self) {
        if self.position + 1 < self.history.len() {
            self.position += 1;
            let url = self.history[self.position].clone();
            self.navigate(url, false);
        }
    }

    fn focus(&mut self) {}

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn current_url(&self) -> Option<String> {
        self.history.get(self.position).cloned()
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        // Invalidate any load still in flight.
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

struct PageLoad {
    client: reqwest::Client,
    channel: HostChannel,
    timeout: Duration,
    generation: Arc<AtomicU64>,
    expected: u64,
    ignoring_cache: bool,
}

impl PageLoad {
    fn is_current(&self) -> bool {
        self.generation.load(Ordering::SeqCst) == self.expected
    }

    fn emit(&self, event: ContextEvent) {
        if self.is_current() {
            self.channel.emit(event);
        }
    }

    async fn run(self, url: String) {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            // Bundled pages are always available.
            self.emit(ContextEvent::DomReady);
            return;
        }

        let mut response = match self.fetch(&url, None).await {
            Ok(response) => response,
            Err(error) => {
                self.emit(ContextEvent::LoadFailed {
                    url,
                    main_frame: true,
                    error,
                });
                return;
            }
        };

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            if let Some(credentials) = self.request_login(&url).await {
                match self.fetch(&url, Some(credentials)).await {
                    Ok(retried) => response = retried,
                    Err(error) => {
                        self.emit(ContextEvent::LoadFailed {
                            url,
                            main_frame: true,
                            error,
                        });
                        return;
                    }
                }
            }
        }

        let status = response.status();
        self.emit(ContextEvent::ResponseReceived {
            url: url.clone(),
            main_frame: true,
            status: status.as_u16(),
        });
        if !status.is_success() {
            return;
        }

        let body = read_prefix(response, MAX_PAGE_SIZE).await;
        self.emit(ContextEvent::DomReady);
        if let Some(title) = extract_title(&body) {
            self.emit(ContextEvent::Message(HostMessage::TitleChanged(title)));
        }
    }

    async fn fetch(
        &self,
        url: &str,
        credentials: Option<(String, SecretString)>,
    ) -> Result<reqwest::Response, String> {
        let mut request = self.client.get(url);
        if let Some((username, password)) = &credentials {
            request = request.basic_auth(username, Some(password.expose_secret()));
        }
        if self.ignoring_cache {
            request = request.header(reqwest::header::CACHE_CONTROL, "no-cache");
        }

        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                tracing::debug!(url = %url, error = %e, "Page load failed");
                Err(e.to_string())
            }
            Err(_) => Err("timed out".to_string()),
        }
    }

    /// Ask the orchestrator for credentials to answer an auth challenge.
    async fn request_login(&self, url: &str) -> Option<(String, SecretString)> {
        if !self.is_current() {
            return None;
        }
        let (respond, answer) = oneshot::channel();
        self.channel.emit(ContextEvent::LoginRequested {
            url: url.to_string(),
            respond,
        });
        match tokio::time::timeout(self.timeout, answer).await {
            Ok(Ok(credentials)) => credentials,
            _ => None,
        }
    }
}

/// Read at most `limit` bytes of the body; errors end the read early.
async fn read_prefix(response: reqwest::Response, limit: usize) -> String {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        let room = limit.saturating_sub(bytes.len());
        bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if bytes.len() >= limit {
            break;
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}

/// Text of the first `<title>` element, trimmed. Empty titles yield `None`.
fn extract_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = html[start..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}
