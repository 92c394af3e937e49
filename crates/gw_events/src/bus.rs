use gw_core::EndpointStatusEvent;
use tokio::sync::broadcast;

/// Thin adapter to the process-wide event bus (spec §4.4).
///
/// The bus is many-writer, many-reader, reentrancy-safe, and assumes no
/// back-pressure (spec §5): a lagging subscriber drops stale events rather
/// than blocking a publisher, which `tokio::sync::broadcast` gives for
/// free. Listener errors on the subscriber side must never propagate back
/// into the manager — this trait's `publish` is infallible for exactly
/// that reason.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: EndpointStatusEvent);
}

/// Default [`EventBus`] backed by a `tokio::sync::broadcast` channel.
pub struct BroadcastEventBus {
    tx: broadcast::Sender<EndpointStatusEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to published `endpoint:status:changed` events.
    pub fn subscribe(&self) -> broadcast::Receiver<EndpointStatusEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, event: EndpointStatusEvent) {
        tracing::debug!(
            endpoint = %event.endpoint,
            operation = ?event.operation,
            success = event.success,
            "endpoint:status:changed"
        );
        // No subscribers is not an error — fire-and-forget per spec §4.4.
        if self.tx.send(event).is_err() {
            tracing::trace!("publish: no subscribers currently attached");
        }
    }
}
