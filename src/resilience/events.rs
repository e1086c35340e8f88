use std::sync::Arc;
use tokio::sync::broadcast;

/// Observability events from the retry and circuit breaker layers.
///
/// The core retry/breaker logic publishes here instead of taking logging
/// callbacks; anything interested (metrics, realtime, tests) subscribes.
#[derive(Clone, Debug)]
pub enum ResilienceEvent {
    Retry {
        dependency: String,
        attempt: u32,
        error: String,
    },
    BreakerOpened {
        dependency: String,
    },
    BreakerClosed {
        dependency: String,
    },
}

#[derive(Clone)]
pub struct ResilienceEvents {
    tx: broadcast::Sender<Arc<ResilienceEvent>>,
}

impl ResilienceEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Publishes an event. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: ResilienceEvent) {
        let _ = self.tx.send(Arc::new(event));
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ResilienceEvent>> {
        self.tx.subscribe()
    }
}

impl Default for ResilienceEvents {
    fn default() -> Self {
        Self::new()
    }
}
