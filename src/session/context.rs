use tokio::sync::mpsc;

use super::message::{ContextEnvelope, ContextEvent, RendererMessage};
use crate::registry::Host;

/// One isolated browsing environment rendering a single host.
///
/// Implementations report everything asynchronous through the
/// [`HostChannel`] they were created with; the methods here only start work.
pub trait BrowsingContext: Send {
    /// Navigate the main frame to `url`.
    fn load(&mut self, url: &str);

    fn reload(&mut self, ignoring_cache: bool);

    fn send(&mut self, message: RendererMessage);

    fn go_back(&mut self);

    fn go_forward(&mut self);

    fn focus(&mut self);

    fn set_visible(&mut self, visible: bool);

    /// Main-frame URL currently shown, if any.
    fn current_url(&self) -> Option<String>;

    /// Tear the context down. No events are reported afterwards.
    fn destroy(&mut self);
}

/// Creates browsing contexts on demand.
pub trait ContextFactory: Send {
    fn create(&mut self, host: &Host, channel: HostChannel) -> Box<dyn BrowsingContext>;
}

/// Sending half of the multiplexed context channel, bound to one host.
#[derive(Debug, Clone)]
pub struct HostChannel {
    host: String,
    tx: mpsc::UnboundedSender<ContextEnvelope>,
}

impl HostChannel {
    pub fn new(host: impl Into<String>, tx: mpsc::UnboundedSender<ContextEnvelope>) -> Self {
        Self {
            host: host.into(),
            tx,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Report `event`. Returns `false` once the orchestrator has gone away.
    pub fn emit(&self, event: ContextEvent) -> bool {
        self.tx
            .send(ContextEnvelope {
                host: self.host.clone(),
                event,
            })
            .is_ok()
    }
}
