//! Endpoint entry types
//!
//! This module defines the per-endpoint state stored in the router: publisher
//! entries with their matched receiver lists, subscriber entries with their
//! delivery mode, and the name-matching rule that links the two.

use parking_lot::Mutex;

use crate::ring::RecordRing;

/// Callback invoked for each record delivered to a synchronous subscriber
pub type RecordCallback = Box<dyn FnMut(&[u8]) + Send>;

/// How records reach a subscriber
pub(crate) enum DeliveryMode {
    /// Invoke a callback on the publishing thread
    Callback(RecordCallback),
    /// Copy the record into a ring the consumer polls
    Buffered(RecordRing),
}

impl std::fmt::Debug for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Callback(_) => f.write_str("Callback"),
            DeliveryMode::Buffered(ring) => f.debug_tuple("Buffered").field(ring).finish(),
        }
    }
}

/// Entry for a publisher endpoint
#[derive(Debug)]
pub(crate) struct PublisherEntry {
    /// Producer name this publisher advertises
    pub(crate) source: String,

    /// Pipe (topic) the publisher sends on
    pub(crate) pipe: String,

    /// Subscriber arena indices currently matched to this publisher
    ///
    /// Non-owning: the subscriber store owns the entries, and destroying a
    /// subscriber sweeps its index out of every list before the entry drops.
    pub(crate) receivers: Vec<usize>,
}

impl PublisherEntry {
    pub(crate) fn new(source: &str, pipe: &str) -> Self {
        Self {
            source: source.to_owned(),
            pipe: pipe.to_owned(),
            receivers: Vec::new(),
        }
    }
}

/// Entry for a subscriber endpoint
#[derive(Debug)]
pub(crate) struct SubscriberEntry {
    /// Producer name to accept records from; empty accepts any producer
    pub(crate) source_filter: String,

    /// Pipe (topic) the subscriber listens on
    pub(crate) pipe: String,

    /// Whether deliveries currently reach this subscriber
    ///
    /// Toggled under the exclusive topology lock, read under the shared one.
    pub(crate) enabled: bool,

    /// Delivery state, serialized across all publisher threads targeting
    /// this subscriber
    pub(crate) delivery: Mutex<DeliveryMode>,
}

impl SubscriberEntry {
    pub(crate) fn new(source_filter: &str, pipe: &str, delivery: DeliveryMode) -> Self {
        Self {
            source_filter: source_filter.to_owned(),
            pipe: pipe.to_owned(),
            enabled: true,
            delivery: Mutex::new(delivery),
        }
    }

    /// Whether this subscriber should be linked to `publisher`
    pub(crate) fn matches(&self, publisher: &PublisherEntry) -> bool {
        self.pipe == publisher.pipe
            && (self.source_filter.is_empty() || self.source_filter == publisher.source)
    }
}

/// Statistics for a subscriber endpoint
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Whether the subscriber is currently eligible for delivery
    pub enabled: bool,
    /// Records waiting in the ring (0 for callback subscribers)
    pub buffered_records: usize,
    /// Ring capacity in bytes (`None` for callback subscribers)
    pub buffer_capacity: Option<usize>,
}
