//! Endpoint registry and record routing
//!
//! The router is the single store of all publisher and subscriber endpoints
//! and the matcher that links them by name. Publishing walks the publisher's
//! already-computed receiver list and fans the record out to every linked,
//! enabled subscriber.
//!
//! # Architecture
//!
//! ```text
//!                               Router
//!                ┌───────────────────────────────────┐
//!                │ RwLock<Topology>                  │
//!                │   publishers: Arena<Publisher> ───┼──► receivers: [idx..]
//!                │   subscribers: Arena<Subscriber>  │
//!                └────────────────┬──────────────────┘
//!                                 │ publish (shared lock)
//!            ┌────────────────────┼────────────────────┐
//!            ▼                    ▼                    ▼
//!      [Subscriber]         [Subscriber]         [Subscriber]
//!      Mutex ─ callback     Mutex ─ callback     Mutex ─ RecordRing
//!            │                    │                    │
//!        cb(data)             cb(data)          peek() / consume()
//! ```
//!
//! # Locking
//!
//! Two levels. The topology `RwLock` is taken exclusively by endpoint
//! create/destroy/toggle and in shared mode by publish/peek/consume, so
//! unrelated producers publish concurrently. Each subscriber then carries its
//! own mutex, making delivery to one subscriber at-most-once-concurrent
//! across all producer threads that target it.
//!
//! Nothing at this layer blocks waiting for data: request/response protocols
//! built on top poll a subscriber's ring and manage their own timeouts.

pub mod config;
pub mod endpoint;
pub mod handle;
pub mod store;

mod arena;

pub use config::RouterConfig;
pub use endpoint::{RecordCallback, SubscriberStats};
pub use handle::{PublisherHandle, SubscriberHandle};
pub use store::Router;
