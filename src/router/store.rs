//! Data router implementation
//!
//! The central registry of publisher and subscriber endpoints, the name
//! matcher that links them, and the publish fan-out path.

use bytes::Bytes;
use parking_lot::RwLock;

use crate::ring::RecordRing;

use super::arena::Arena;
use super::config::RouterConfig;
use super::endpoint::{DeliveryMode, PublisherEntry, SubscriberEntry, SubscriberStats};
use super::handle::{PublisherHandle, SubscriberHandle};

/// Endpoint stores plus the matched links between them
///
/// Everything in here is guarded by the router's topology lock: mutated only
/// under the write lock, read by delivery code under the read lock.
struct Topology {
    publishers: Arena<PublisherEntry>,
    subscribers: Arena<SubscriberEntry>,
}

impl Topology {
    /// Recompute publisher receiver lists from names
    ///
    /// Full idempotent rescan of every (publisher, subscriber) pair, run on
    /// each endpoint creation. O(Tx×Rx), but immune to missed-link bugs:
    /// missing links are appended, existing ones are left alone.
    fn relink(&mut self) {
        let Topology {
            publishers,
            subscribers,
        } = self;

        for (_, publisher) in publishers.iter_mut() {
            for (index, subscriber) in subscribers.iter() {
                if !subscriber.matches(publisher) {
                    continue;
                }
                if publisher.receivers.contains(&index) {
                    continue;
                }
                publisher.receivers.push(index);
                tracing::debug!(
                    source = %publisher.source,
                    pipe = %publisher.pipe,
                    filter = %subscriber.source_filter,
                    "Linked subscriber to publisher"
                );
            }
        }
    }

    fn find_publisher(&self, source: &str, pipe: &str) -> Option<PublisherHandle> {
        let (index, _) = self
            .publishers
            .iter()
            .find(|(_, p)| p.source == source && p.pipe == pipe)?;
        let generation = self.publishers.generation(index)?;
        Some(PublisherHandle { index, generation })
    }
}

/// In-process publish/subscribe data router
///
/// Producers and consumers discover each other purely by name: a publisher
/// advertises `(source, pipe)`, a subscriber asks for a pipe and an optional
/// source filter, and the router links every eligible pair. One published
/// record fans out to every linked, enabled subscriber.
///
/// Thread-safe via two lock levels: one topology `RwLock` (exclusive for
/// endpoint create/destroy, shared for publish/peek/consume) and one mutex
/// per subscriber serializing callback invocation or ring access across all
/// publishing threads. Any number of threads may publish concurrently,
/// including against the same publisher or the same subscriber.
pub struct Router {
    topology: RwLock<Topology>,
}

impl Router {
    /// Create a router with default configuration
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a router with custom configuration
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            topology: RwLock::new(Topology {
                publishers: Arena::with_capacity(config.publisher_capacity),
                subscribers: Arena::with_capacity(config.subscriber_capacity),
            }),
        }
    }

    /// Register a publisher endpoint
    ///
    /// Idempotent on `(source, pipe)`: if that pair already exists, the
    /// existing handle is returned and no new endpoint or link is created.
    pub fn create_publisher(&self, source: &str, pipe: &str) -> PublisherHandle {
        let mut topology = self.topology.write();

        if let Some(existing) = topology.find_publisher(source, pipe) {
            tracing::debug!(
                source = %source,
                pipe = %pipe,
                "Publisher already exists, returning existing handle"
            );
            return existing;
        }

        let (index, generation) = topology.publishers.insert(PublisherEntry::new(source, pipe));
        topology.relink();

        tracing::info!(source = %source, pipe = %pipe, "Publisher registered");
        PublisherHandle { index, generation }
    }

    /// Destroy a publisher endpoint
    ///
    /// Removes only the publisher; its matched subscribers are unaffected
    /// and remain usable by other publishers. A stale handle (already
    /// destroyed, or from another router) is logged and ignored.
    pub fn destroy_publisher(&self, handle: PublisherHandle) {
        let mut topology = self.topology.write();

        match topology.publishers.remove(handle.index, handle.generation) {
            Some(entry) => {
                tracing::info!(source = %entry.source, pipe = %entry.pipe, "Publisher destroyed");
            }
            None => {
                tracing::warn!(handle = %handle, "Destroy of a stale publisher handle");
            }
        }
    }

    /// Register a synchronous subscriber endpoint
    ///
    /// `callback` runs on the publishing thread, under this subscriber's
    /// mutex. A callback that blocks stalls the publishing thread and every
    /// other publisher delivering to this subscriber, so it must stay short.
    ///
    /// Subscribers are never deduplicated: each call creates an independent
    /// endpoint, even with identical filter and pipe.
    pub fn create_subscriber_sync(
        &self,
        source_filter: &str,
        pipe: &str,
        callback: impl FnMut(&[u8]) + Send + 'static,
    ) -> SubscriberHandle {
        let handle = self.create_subscriber(
            source_filter,
            pipe,
            DeliveryMode::Callback(Box::new(callback)),
        );
        tracing::info!(filter = %source_filter, pipe = %pipe, mode = "sync", "Subscriber registered");
        handle
    }

    /// Register an asynchronous (polled) subscriber endpoint
    ///
    /// Records are copied into a ring of `capacity` bytes which the consumer
    /// drains with [`peek`](Self::peek) and [`consume`](Self::consume). A
    /// record that does not fit is dropped and reported to the publisher
    /// through the negative return of [`publish`](Self::publish).
    pub fn create_subscriber_async(
        &self,
        source_filter: &str,
        pipe: &str,
        capacity: usize,
    ) -> SubscriberHandle {
        let handle = self.create_subscriber(
            source_filter,
            pipe,
            DeliveryMode::Buffered(RecordRing::with_capacity(capacity)),
        );
        tracing::info!(
            filter = %source_filter,
            pipe = %pipe,
            mode = "async",
            capacity = capacity,
            "Subscriber registered"
        );
        handle
    }

    fn create_subscriber(
        &self,
        source_filter: &str,
        pipe: &str,
        delivery: DeliveryMode,
    ) -> SubscriberHandle {
        let mut topology = self.topology.write();

        let (index, generation) = topology
            .subscribers
            .insert(SubscriberEntry::new(source_filter, pipe, delivery));
        topology.relink();

        SubscriberHandle { index, generation }
    }

    /// Toggle delivery eligibility without touching the topology links
    ///
    /// A disabled subscriber keeps its links and buffer contents; publishes
    /// simply skip it (and exclude it from the returned count).
    pub fn set_subscriber_enabled(&self, handle: SubscriberHandle, enabled: bool) {
        let mut topology = self.topology.write();

        match topology.subscribers.get_mut(handle.index, handle.generation) {
            Some(subscriber) => {
                subscriber.enabled = enabled;
                tracing::debug!(handle = %handle, enabled = enabled, "Subscriber toggled");
            }
            None => {
                tracing::warn!(handle = %handle, "Enable/disable of a stale subscriber handle");
            }
        }
    }

    /// Destroy a subscriber endpoint
    ///
    /// Unlinks it from every publisher's receiver list, then releases the
    /// entry and its ring storage. The exclusive topology lock excludes any
    /// in-flight delivery, so the storage cannot be freed under a publisher
    /// still using it. A stale handle is logged and ignored.
    pub fn destroy_subscriber(&self, handle: SubscriberHandle) {
        let mut topology = self.topology.write();

        let Some(entry) = topology.subscribers.remove(handle.index, handle.generation) else {
            tracing::warn!(handle = %handle, "Destroy of a stale subscriber handle");
            return;
        };

        for (_, publisher) in topology.publishers.iter_mut() {
            publisher.receivers.retain(|&index| index != handle.index);
        }

        tracing::info!(filter = %entry.source_filter, pipe = %entry.pipe, "Subscriber destroyed");
    }

    /// Publish one record to every linked, enabled subscriber
    ///
    /// Fan-out, not a transaction: synchronous subscribers get their callback
    /// invoked on this thread, asynchronous ones get a copy pushed into their
    /// ring, and a failure on one receiver never rolls back delivery to the
    /// others.
    ///
    /// Returns the number of receivers delivered to (0 if none are linked or
    /// all are disabled). If any ring pushes fail, returns the negated
    /// failure count instead; dropped records are not retried.
    pub fn publish(&self, handle: PublisherHandle, data: &[u8]) -> isize {
        let topology = self.topology.read();

        let Some(publisher) = topology.publishers.get(handle.index, handle.generation) else {
            tracing::warn!(handle = %handle, "Publish on a stale publisher handle");
            return 0;
        };

        let mut delivered: isize = 0;
        let mut failures: isize = 0;

        for &index in &publisher.receivers {
            // Receiver lists are swept on subscriber destruction under the
            // write lock, so a linked index always resolves here.
            let Some(subscriber) = topology.subscribers.get_raw(index) else {
                continue;
            };
            if !subscriber.enabled {
                continue;
            }

            let mut delivery = subscriber.delivery.lock();
            match &mut *delivery {
                DeliveryMode::Callback(callback) => {
                    callback(data);
                    delivered += 1;
                }
                DeliveryMode::Buffered(ring) => match ring.push(data) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        failures += 1;
                        tracing::debug!(
                            source = %publisher.source,
                            pipe = %publisher.pipe,
                            len = data.len(),
                            error = %err,
                            "Record dropped"
                        );
                    }
                },
            }
        }

        if failures > 0 {
            -failures
        } else {
            delivered
        }
    }

    /// Copy out the oldest buffered record of an asynchronous subscriber
    ///
    /// Non-destructive: the record stays at the front of the ring until
    /// [`consume`](Self::consume). Returns `None` for an empty ring, a
    /// synchronous subscriber, or a stale handle.
    pub fn peek(&self, handle: SubscriberHandle) -> Option<Bytes> {
        let topology = self.topology.read();

        let Some(subscriber) = topology.subscribers.get(handle.index, handle.generation) else {
            tracing::warn!(handle = %handle, "Peek on a stale subscriber handle");
            return None;
        };

        let mut delivery = subscriber.delivery.lock();
        match &mut *delivery {
            DeliveryMode::Buffered(ring) => ring.peek().map(Bytes::copy_from_slice),
            DeliveryMode::Callback(_) => None,
        }
    }

    /// Drop the oldest buffered record of an asynchronous subscriber
    ///
    /// No-op for an empty ring, a synchronous subscriber, or a stale handle.
    pub fn consume(&self, handle: SubscriberHandle) {
        let topology = self.topology.read();

        let Some(subscriber) = topology.subscribers.get(handle.index, handle.generation) else {
            tracing::warn!(handle = %handle, "Consume on a stale subscriber handle");
            return;
        };

        let mut delivery = subscriber.delivery.lock();
        if let DeliveryMode::Buffered(ring) = &mut *delivery {
            ring.pop();
        }
    }

    /// Number of live publisher endpoints
    pub fn publisher_count(&self) -> usize {
        self.topology.read().publishers.len()
    }

    /// Number of live subscriber endpoints
    pub fn subscriber_count(&self) -> usize {
        self.topology.read().subscribers.len()
    }

    /// Statistics for a subscriber endpoint
    pub fn subscriber_stats(&self, handle: SubscriberHandle) -> Option<SubscriberStats> {
        let topology = self.topology.read();
        let subscriber = topology.subscribers.get(handle.index, handle.generation)?;

        let delivery = subscriber.delivery.lock();
        let (buffered_records, buffer_capacity) = match &*delivery {
            DeliveryMode::Buffered(ring) => (ring.len(), Some(ring.capacity())),
            DeliveryMode::Callback(_) => (0, None),
        };

        Some(SubscriberStats {
            enabled: subscriber.enabled,
            buffered_records,
            buffer_capacity,
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, Mutex};

    use super::*;

    /// Route log output through the test harness; `RUST_LOG` filters as usual.
    fn init_tracing() {
        use tracing_subscriber::EnvFilter;

        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_create_publisher_idempotent() {
        init_tracing();
        let router = Router::new();

        let first = router.create_publisher("PORT123", "frames");
        let second = router.create_publisher("PORT123", "frames");

        assert_eq!(first, second);
        assert_eq!(router.publisher_count(), 1);

        // Same source on a different pipe is a distinct endpoint.
        let other = router.create_publisher("PORT123", "status");
        assert_ne!(first, other);
        assert_eq!(router.publisher_count(), 2);
    }

    #[test]
    fn test_fanout_to_all_subscribers() {
        let router = Router::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = Arc::clone(&seen);
            router.create_subscriber_sync("", "frames", move |data| {
                seen.lock().unwrap().push(data.to_vec());
            });
        }
        let polled = router.create_subscriber_async("", "frames", 256);
        let publisher = router.create_publisher("PORT1", "frames");

        assert_eq!(router.publish(publisher, b"payload"), 3);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[b"payload".to_vec(), b"payload".to_vec()]);
        assert_eq!(router.peek(polled), Some(Bytes::from_static(b"payload")));
    }

    #[test]
    fn test_source_filter_blocks_other_producers() {
        let router = Router::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_cb = Arc::clone(&hits);
        router.create_subscriber_sync("PORT123", "frames", move |_| {
            hits_cb.fetch_add(1, Ordering::SeqCst);
        });

        let matching = router.create_publisher("PORT123", "frames");
        let wrong_source = router.create_publisher("PORT999", "frames");
        let wrong_pipe = router.create_publisher("PORT123", "status");

        assert_eq!(router.publish(wrong_source, b"x"), 0);
        assert_eq!(router.publish(wrong_pipe, b"x"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert_eq!(router.publish(matching, b"x"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_subscriber_excluded() {
        let router = Router::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_cb = Arc::clone(&hits);
        let subscriber = router.create_subscriber_sync("", "frames", move |_| {
            hits_cb.fetch_add(1, Ordering::SeqCst);
        });
        let publisher = router.create_publisher("PORT1", "frames");

        router.set_subscriber_enabled(subscriber, false);
        assert_eq!(router.publish(publisher, b"x"), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        // Re-enabling resumes delivery without re-linking.
        router.set_subscriber_enabled(subscriber, true);
        assert_eq!(router.publish(publisher, b"x"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_async_subscriber_buffer_untouched() {
        let router = Router::new();
        let subscriber = router.create_subscriber_async("", "frames", 128);
        let publisher = router.create_publisher("PORT1", "frames");

        router.set_subscriber_enabled(subscriber, false);
        assert_eq!(router.publish(publisher, b"x"), 0);

        let stats = router.subscriber_stats(subscriber).unwrap();
        assert!(!stats.enabled);
        assert_eq!(stats.buffered_records, 0);
        assert_eq!(router.peek(subscriber), None);
    }

    #[test]
    fn test_publish_with_no_receivers() {
        let router = Router::new();
        let publisher = router.create_publisher("PORT1", "frames");

        assert_eq!(router.publish(publisher, b"x"), 0);
    }

    #[test]
    fn test_failure_count_dominates_mixed_outcome() {
        let router = Router::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_cb = Arc::clone(&hits);
        router.create_subscriber_sync("", "frames", move |_| {
            hits_cb.fetch_add(1, Ordering::SeqCst);
        });
        // Ring too small for the payload: every push fails.
        router.create_subscriber_async("", "frames", 16);
        let publisher = router.create_publisher("PORT1", "frames");

        // The sync delivery succeeds, but the failure count wins the return.
        assert_eq!(router.publish(publisher, &[0u8; 64]), -1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_buffer_full_reported_and_recoverable() {
        let router = Router::new();
        let subscriber = router.create_subscriber_async("", "frames", 32);
        let publisher = router.create_publisher("PORT1", "frames");

        assert_eq!(router.publish(publisher, &[1u8; 12]), 1);
        // No room for a second record of the same size.
        assert_eq!(router.publish(publisher, &[2u8; 12]), -1);

        // Draining the ring makes room again.
        assert_eq!(router.peek(subscriber), Some(Bytes::from(vec![1u8; 12])));
        router.consume(subscriber);
        assert_eq!(router.publish(publisher, &[3u8; 12]), 1);
    }

    #[test]
    fn test_peek_consume_preserve_publish_order() {
        let router = Router::new();
        let subscriber = router.create_subscriber_async("", "frames", 256);
        let publisher = router.create_publisher("PORT1", "frames");

        router.publish(publisher, b"one");
        router.publish(publisher, b"two");
        router.publish(publisher, b"three");

        for expected in [&b"one"[..], b"two", b"three"] {
            assert_eq!(router.peek(subscriber), Some(Bytes::copy_from_slice(expected)));
            router.consume(subscriber);
        }
        assert_eq!(router.peek(subscriber), None);
        // Consuming an empty ring is a no-op.
        router.consume(subscriber);
    }

    #[test]
    fn test_peek_on_sync_subscriber() {
        let router = Router::new();
        let subscriber = router.create_subscriber_sync("", "frames", |_| {});

        assert_eq!(router.peek(subscriber), None);
        router.consume(subscriber); // No-op
    }

    #[test]
    fn test_destroy_subscriber_unlinks_everywhere() {
        let router = Router::new();
        let subscriber = router.create_subscriber_async("", "frames", 128);
        let a = router.create_publisher("A", "frames");
        let b = router.create_publisher("B", "frames");

        assert_eq!(router.publish(a, b"x"), 1);
        router.destroy_subscriber(subscriber);

        assert_eq!(router.publish(a, b"x"), 0);
        assert_eq!(router.publish(b, b"x"), 0);
        assert_eq!(router.subscriber_count(), 0);
        assert_eq!(router.peek(subscriber), None);
    }

    #[test]
    fn test_destroy_publisher_leaves_subscribers_usable() {
        let router = Router::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_cb = Arc::clone(&hits);
        router.create_subscriber_sync("", "frames", move |_| {
            hits_cb.fetch_add(1, Ordering::SeqCst);
        });
        let a = router.create_publisher("A", "frames");
        let b = router.create_publisher("B", "frames");

        router.destroy_publisher(a);

        assert_eq!(router.publish(a, b"x"), 0); // Stale handle
        assert_eq!(router.publish(b, b"x"), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_destroy_is_noop() {
        let router = Router::new();
        let publisher = router.create_publisher("A", "frames");
        let subscriber = router.create_subscriber_sync("", "frames", |_| {});

        router.destroy_publisher(publisher);
        router.destroy_publisher(publisher);
        router.destroy_subscriber(subscriber);
        router.destroy_subscriber(subscriber);

        assert_eq!(router.publisher_count(), 0);
        assert_eq!(router.subscriber_count(), 0);

        // Stale toggles are ignored too.
        router.set_subscriber_enabled(subscriber, false);
    }

    #[test]
    fn test_late_publisher_matches_existing_subscribers() {
        let router = Router::new();
        let subscriber = router.create_subscriber_async("", "frames", 128);

        // Subscriber existed first; the publisher links on creation.
        let publisher = router.create_publisher("PORT1", "frames");
        assert_eq!(router.publish(publisher, b"x"), 1);
        assert_eq!(router.peek(subscriber), Some(Bytes::from_static(b"x")));
    }

    #[test]
    fn test_late_subscriber_matches_existing_publisher() {
        let router = Router::new();
        let publisher = router.create_publisher("PORT1", "frames");

        let subscriber = router.create_subscriber_async("PORT1", "frames", 128);
        assert_eq!(router.publish(publisher, b"x"), 1);
        assert_eq!(router.peek(subscriber), Some(Bytes::from_static(b"x")));
    }

    #[test]
    fn test_slot_reuse_does_not_inherit_links() {
        let router = Router::new();
        let publisher = router.create_publisher("PORT1", "frames");

        let old = router.create_subscriber_async("", "frames", 128);
        router.destroy_subscriber(old);

        // Reuses the freed slot, but listens on an unrelated pipe.
        let unrelated = router.create_subscriber_async("", "status", 128);

        assert_eq!(router.publish(publisher, b"x"), 0);
        assert_eq!(router.peek(unrelated), None);
    }

    #[test]
    fn test_subscriber_stats() {
        let router = Router::new();
        let polled = router.create_subscriber_async("", "frames", 128);
        let callback = router.create_subscriber_sync("", "frames", |_| {});
        let publisher = router.create_publisher("PORT1", "frames");

        router.publish(publisher, b"x");
        router.publish(publisher, b"y");

        let stats = router.subscriber_stats(polled).unwrap();
        assert!(stats.enabled);
        assert_eq!(stats.buffered_records, 2);
        assert_eq!(stats.buffer_capacity, Some(128));

        let stats = router.subscriber_stats(callback).unwrap();
        assert_eq!(stats.buffered_records, 0);
        assert_eq!(stats.buffer_capacity, None);

        router.destroy_subscriber(polled);
        assert!(router.subscriber_stats(polled).is_none());
    }

    #[test]
    fn test_independent_routers_do_not_interact() {
        let first = Router::new();
        let second = Router::new();

        first.create_subscriber_async("", "frames", 128);
        let publisher = second.create_publisher("PORT1", "frames");

        // The subscriber lives in a different router instance.
        assert_eq!(second.publish(publisher, b"x"), 0);
    }

    #[test]
    fn test_concurrent_publish_stress() {
        init_tracing();

        const THREADS: usize = 1000;

        let router = Arc::new(Router::new());
        let barrier = Arc::new(Barrier::new(THREADS));
        let delivered = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let router = Arc::clone(&router);
                let barrier = Arc::clone(&barrier);
                let delivered = Arc::clone(&delivered);

                std::thread::spawn(move || {
                    let pipe = format!("pipe-{i}");
                    let publisher = router.create_publisher("", &pipe);
                    let delivered_cb = Arc::clone(&delivered);
                    router.create_subscriber_sync("", &pipe, move |_| {
                        delivered_cb.fetch_add(1, Ordering::SeqCst);
                    });

                    barrier.wait();
                    router.publish(publisher, b"ping")
                })
            })
            .collect();

        let mut returned: isize = 0;
        for handle in handles {
            returned += handle.join().unwrap();
        }

        // Every thread's pipe is distinct, so each publish reaches exactly
        // its own subscriber: no drops, no duplicates, no deadlock.
        assert_eq!(returned, THREADS as isize);
        assert_eq!(delivered.load(Ordering::SeqCst), THREADS);
    }
}
