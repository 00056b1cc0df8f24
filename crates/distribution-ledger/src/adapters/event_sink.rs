//! # Event Sinks
//!
//! - [`InMemoryEventLog`]: records every event, for tests and audits.
//! - [`BroadcastEventSink`]: fans events out over `tokio::sync::broadcast`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::events::DistributionEvent;
use crate::ports::outbound::EventSink;

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

// =============================================================================
// RECORDING LOG
// =============================================================================

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<DistributionEvent>>,
}

impl InMemoryEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<DistributionEvent> {
        self.events.lock().clone()
    }

    /// Recorded events published under `topic`.
    #[must_use]
    pub fn by_topic(&self, topic: &str) -> Vec<DistributionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.topic() == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for InMemoryEventLog {
    fn publish(&self, event: DistributionEvent) -> usize {
        self.events.lock().push(event);
        1
    }

    fn events_published(&self) -> u64 {
        self.events.lock().len() as u64
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast sink with multi-consumer semantics.
///
/// Events published with no live receiver are dropped.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<DistributionEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl BroadcastEventSink {
    /// Create a sink with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a sink with the given channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DistributionEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: DistributionEvent) -> usize {
        let topic = event.topic();

        // counted even when nobody listens
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic, receivers, "Event published");
                receivers
            }
            Err(e) => {
                warn!(topic, error = %e, "Event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
