//! Endpoint handles
//!
//! Handles are small `Copy` tickets identifying an endpoint slot in the
//! router plus the generation it was created under. A handle outliving its
//! endpoint (destroyed twice, or used after destruction) no longer matches
//! the slot's generation and is rejected as stale rather than addressing a
//! recycled endpoint.

use std::fmt;

/// Handle to a publisher endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherHandle {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl fmt::Display for PublisherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}.{}", self.index, self.generation)
    }
}

/// Handle to a subscriber endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle {
    pub(crate) index: usize,
    pub(crate) generation: u64,
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rx#{}.{}", self.index, self.generation)
    }
}
