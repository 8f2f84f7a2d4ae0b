//! # Event Publishers
//!
//! - `InMemoryEventLog`: keeps every event, for assertions
//! - `LoggingEventPublisher`: writes events to the tracing subscriber

use crate::events::PoolEvent;
use crate::ports::outbound::EventPublisher;
use parking_lot::RwLock;
use tracing::info;

#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<PoolEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventPublisher for InMemoryEventLog {
    fn publish(&self, event: PoolEvent) {
        self.events.write().push(event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: PoolEvent) {
        info!(kind = event.kind(), ?event, "pool event");
    }
}
