//! IterationBus - pub/sub for completed iterations
//!
//! Backed by a tokio broadcast channel. Hosts (dashboards, loggers) subscribe;
//! the orchestrator emits one event per iteration.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::IterationEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus for iteration events
pub struct IterationBus {
    tx: broadcast::Sender<IterationEvent>,
}

impl IterationBus {
    /// Create a new bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "IterationBus::new: creating bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped; lagging
    /// subscribers lose the oldest events.
    pub fn emit(&self, event: IterationEvent) {
        debug!(
            run_id = %event.run_id,
            iteration = event.iteration_index(),
            "IterationBus::emit"
        );
        // No subscribers is OK
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<IterationEvent> {
        debug!("IterationBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for IterationBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::IterationSnapshot;
    use crate::orchestrator::RunState;

    fn event(i: u32) -> IterationEvent {
        IterationEvent {
            run_id: "run-1".to_string(),
            pipeline: "presentation".to_string(),
            project_id: "proj".to_string(),
            snapshot: IterationSnapshot {
                iteration_index: i,
                quality_achieved: 0.5,
                best_quality_score: 0.5,
                actions_taken: vec![],
                replans_so_far: 0,
                recorded_at: chrono::Utc::now(),
            },
            state: RunState::Running,
            stagnation_counter: 0,
        }
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = IterationBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.emit(event(0));
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = IterationBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(event(0));
        bus.emit(event(1));

        assert_eq!(rx1.recv().await.unwrap().iteration_index(), 0);
        assert_eq!(rx1.recv().await.unwrap().iteration_index(), 1);
        assert_eq!(rx2.recv().await.unwrap().iteration_index(), 0);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = IterationBus::new(16);
        bus.emit(event(0));
        let mut rx = bus.subscribe();
        bus.emit(event(1));
        assert_eq!(rx.recv().await.unwrap().iteration_index(), 1);
    }
}
