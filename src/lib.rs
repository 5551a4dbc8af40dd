//! In-process publish/subscribe data router
//!
//! Independent producers and consumers discover each other purely by name at
//! runtime: a publisher advertises a producer name on a pipe (topic), a
//! subscriber names a pipe and an optional source filter, and the router
//! links every eligible pair. One published record fans out to every linked,
//! enabled subscriber — synchronously into a callback on the publishing
//! thread, or asynchronously into a per-subscriber circular buffer the
//! consumer polls.
//!
//! ```
//! use pipebus::Router;
//!
//! let router = Router::new();
//!
//! // Poll-style consumer with a 256-byte ring; empty filter accepts any producer.
//! let inbox = router.create_subscriber_async("", "telemetry", 256);
//!
//! let publisher = router.create_publisher("sensor-1", "telemetry");
//! assert_eq!(router.publish(publisher, b"42"), 1);
//!
//! assert_eq!(router.peek(inbox).as_deref(), Some(&b"42"[..]));
//! router.consume(inbox);
//! assert_eq!(router.peek(inbox), None);
//! ```
//!
//! # Backpressure
//!
//! An asynchronous subscriber's ring rejects records it cannot hold; the
//! record is dropped and the publisher learns about it through the negative
//! return value of [`Router::publish`]. Nothing ever blocks waiting for a
//! consumer.
//!
//! # Concurrency
//!
//! Plain OS threads, no async runtime. See the [`router`] module docs for
//! the two-level locking scheme and its ordering guarantees: deliveries from
//! one producer thread to one subscriber arrive in publish order; nothing
//! more is promised across producers or across subscribers.

pub mod ring;
pub mod router;

pub use ring::{PushError, RecordRing};
pub use router::{PublisherHandle, Router, RouterConfig, SubscriberHandle, SubscriberStats};
