use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use fyp_types::events::MatchEvent;

/// Receives state changes after they commit. Delivery ordering and retry
/// belong to the sink.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: MatchEvent);
}

/// Fans every event out to all subscribers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<MatchEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to all events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.inner.broadcast_tx.subscribe()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for Dispatcher {
    fn publish(&self, event: MatchEvent) {
        debug!(?event, "Publishing event");
        // No subscribers is fine
        let _ = self.inner.broadcast_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fyp_types::models::{RequestKind, RequestStatus};
    use uuid::Uuid;

    fn request_event() -> MatchEvent {
        MatchEvent::RequestChanged {
            request_id: Uuid::new_v4(),
            kind: RequestKind::Partner,
            from_id: Uuid::new_v4(),
            to_id: Uuid::new_v4(),
            status: RequestStatus::Pending,
        }
    }

    #[test]
    fn every_subscriber_sees_every_event() {
        let dispatcher = Dispatcher::new();
        let mut first = dispatcher.subscribe();
        let mut second = dispatcher.clone().subscribe();

        let event = request_event();
        dispatcher.publish(event.clone());

        assert_eq!(first.try_recv().unwrap(), event);
        assert_eq!(second.try_recv().unwrap(), event);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let dispatcher = Dispatcher::new();
        dispatcher.publish(request_event());

        let mut late = dispatcher.subscribe();
        assert!(late.try_recv().is_err());
    }
}
