//! Lifecycle telemetry publishers.

use dynavoice_core::LifecycleEvent;
use dynavoice_interface::EventPublisher;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Writes one structured log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: &LifecycleEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => info!(topic = event.topic(), id = %event.id(), %payload, "Lifecycle event"),
            Err(e) => warn!(topic = event.topic(), error = %e, "Failed to serialize lifecycle event"),
        }
    }
}

/// Fans events out to in-process subscribers.
///
/// Events published while nobody is subscribed are dropped.
///
/// # Example
///
/// ```
/// use dynavoice_core::{ChannelId, LifecycleEvent};
/// use dynavoice_interface::EventPublisher;
/// use dynavoice_lifecycle::BroadcastPublisher;
///
/// let publisher = BroadcastPublisher::new(16);
/// let mut events = publisher.subscribe();
///
/// publisher.publish(&LifecycleEvent::Deleted { id: ChannelId(3) });
/// assert_eq!(events.try_recv().unwrap().id(), ChannelId(3));
/// ```
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl BroadcastPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: &LifecycleEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Publishes every event to each inner publisher in order.
#[derive(Clone, Default)]
pub struct FanoutPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl FanoutPublisher {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a publisher.
    pub fn with(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }
}

impl EventPublisher for FanoutPublisher {
    fn publish(&self, event: &LifecycleEvent) {
        for publisher in &self.publishers {
            publisher.publish(event);
        }
    }
}
