use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// Cross-cutting notifications raised by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Transient message for the user (server `message` or `detail`).
    Toast { level: ToastLevel, message: String },
    /// The server answered 401; the session is no longer valid.
    Unauthorized,
}

/// Broadcast bus for [`ClientEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            trace!("Client event dropped; no subscribers");
        }
    }
}
