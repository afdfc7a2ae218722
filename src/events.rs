//! Typed fan-out for component events.
//!
//! Each component owns an [`Emitter`] of its own closed event enum. Listeners
//! call [`Emitter::subscribe`] once and drain their receiver; the orchestrator
//! drains with `try_recv` right after every mutation so routing stays
//! synchronous and in emission order.

use tokio::sync::mpsc;

/// Subscriber list for one event type.
#[derive(Debug)]
pub struct Emitter<E> {
    subscribers: Vec<mpsc::UnboundedSender<E>>,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> Emitter<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Events emitted from now on are queued for it.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber; dropped receivers are pruned.
    pub fn emit(&mut self, event: E) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
