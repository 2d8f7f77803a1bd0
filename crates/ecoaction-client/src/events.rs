use std::sync::Arc;

use tokio::sync::broadcast;

use ecoaction_types::events::ClientEvent;

const EVENT_CAPACITY: usize = 256;

/// Fan-out of client events to every interested view.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<broadcast::Sender<ClientEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { inner: Arc::new(tx) }
    }

    /// Subscribe to client events. Receivers that fall behind by more than
    /// the channel capacity observe `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: ClientEvent) {
        let _ = self.inner.send(event);
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
