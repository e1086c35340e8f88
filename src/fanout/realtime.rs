use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// One realtime notice addressed to a user, fanned out over a broadcast
/// channel. The API layer bridges subscriptions onto user sockets.
#[derive(Clone, Debug)]
pub struct RealtimeEvent {
    pub user_id: String,
    pub event: String,
    pub payload: Value,
}

/// Process-wide realtime transmitter. Delivery is fire-and-forget and
/// at-most-once; emitting never fails the caller.
#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<Arc<RealtimeEvent>>,
}

impl RealtimeHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Emits an event to a user. A send error only means nobody is
    /// subscribed right now.
    pub fn emit(&self, user_id: &str, event: &str, payload: Value) {
        debug!("Realtime emit '{}' for user {}.", event, user_id);
        let _ = self.tx.send(Arc::new(RealtimeEvent {
            user_id: user_id.to_owned(),
            event: event.to_owned(),
            payload,
        }));
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<RealtimeEvent>> {
        self.tx.subscribe()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
