//! Event broker: in-process fanout from one publisher to every live
//! subscription of a stream.
//!
//! The registry is a [`DashMap`] keyed by stream, so registration and
//! publishing on unrelated streams never contend on a common lock.
//! Publishing only ever calls the non-blocking [`QueueSender::offer`],
//! so a slow subscriber can lose events but can never stall a publisher.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, trace};
use uuid::Uuid;

use super::queue::QueueSender;
use crate::application::ports::{EventPublisher, FanoutReport};
use crate::domain::{DataEvent, StreamId};

/// Unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ticket returned by [`EventBroker::register`]; pass it back to
/// [`EventBroker::deregister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
    stream_id: StreamId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }
}

struct Registration {
    id: SubscriptionId,
    queue: QueueSender,
}

/// Shared broker handle
pub type SharedEventBroker = Arc<EventBroker>;

pub fn create_event_broker() -> SharedEventBroker {
    Arc::new(EventBroker::new())
}

#[derive(Default)]
pub struct EventBroker {
    registry: DashMap<StreamId, Vec<Registration>>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `queue` to the subscriber set of `stream_id`.
    ///
    /// Events published after this returns are offered to the queue; nothing
    /// published earlier is replayed.
    pub fn register(&self, stream_id: StreamId, queue: QueueSender) -> Subscription {
        let id = SubscriptionId::generate();
        let subscribers = {
            let mut entry = self.registry.entry(stream_id).or_default();
            entry.push(Registration { id, queue });
            entry.len()
        };

        metrics::gauge!("datastream_active_subscriptions").increment(1.0);
        info!(
            stream_id = %stream_id,
            subscription_id = %id,
            subscribers,
            "Subscriber registered"
        );

        Subscription { id, stream_id }
    }

    /// Remove a subscription. Returns false if it was already removed.
    ///
    /// The queue's sender is dropped here, which lets the owning delivery
    /// loop observe closure once it has drained what is left.
    pub fn deregister(&self, subscription: &Subscription) -> bool {
        let stream_id = subscription.stream_id;
        let removed = match self.registry.get_mut(&stream_id) {
            Some(mut regs) => {
                let before = regs.len();
                regs.retain(|r| r.id != subscription.id);
                regs.len() != before
            }
            None => false,
        };
        // The shard guard above must be released before remove_if locks it again.
        self.registry.remove_if(&stream_id, |_, regs| regs.is_empty());

        if removed {
            metrics::gauge!("datastream_active_subscriptions").decrement(1.0);
            info!(
                stream_id = %stream_id,
                subscription_id = %subscription.id,
                "Subscriber deregistered"
            );
        } else {
            debug!(
                stream_id = %stream_id,
                subscription_id = %subscription.id,
                "Deregister for unknown subscription ignored"
            );
        }
        removed
    }

    /// Offer `event` to every queue registered for its stream.
    ///
    /// Never blocks and never fails; full queues simply miss the event.
    pub fn publish(&self, event: &Arc<DataEvent>) -> FanoutReport {
        let mut report = FanoutReport::default();
        if let Some(regs) = self.registry.get(&event.stream_id) {
            for reg in regs.iter() {
                if reg.queue.offer(Arc::clone(event)) {
                    report.delivered += 1;
                } else {
                    report.dropped += 1;
                }
            }
        }

        metrics::counter!("datastream_events_published_total").increment(1);
        if report.dropped > 0 {
            metrics::counter!("datastream_events_dropped_total").increment(report.dropped as u64);
            debug!(
                stream_id = %event.stream_id,
                event_id = %event.event_id,
                delivered = report.delivered,
                dropped = report.dropped,
                "Subscriber queue full, event dropped"
            );
        } else {
            trace!(
                stream_id = %event.stream_id,
                event_id = %event.event_id,
                delivered = report.delivered,
                "Event fanned out"
            );
        }
        report
    }

    pub fn subscriber_count(&self, stream_id: StreamId) -> usize {
        self.registry.get(&stream_id).map_or(0, |regs| regs.len())
    }

    pub fn total_subscriptions(&self) -> usize {
        self.registry.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of streams with at least one subscriber
    pub fn stream_count(&self) -> usize {
        self.registry.len()
    }
}

impl EventPublisher for EventBroker {
    fn publish(&self, event: &Arc<DataEvent>) -> FanoutReport {
        EventBroker::publish(self, event)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::application::streaming::queue::{subscriber_queue, Polled, QueueReceiver};
    use crate::domain::EventPayload;

    const WAIT: Duration = Duration::from_millis(50);

    fn event(stream_id: StreamId, body: &'static [u8]) -> Arc<DataEvent> {
        Arc::new(DataEvent::new(
            stream_id,
            EventPayload::new(body).unwrap(),
            HashMap::new(),
        ))
    }

    async fn next_id(rx: &mut QueueReceiver) -> Option<Uuid> {
        match rx.poll(WAIT).await {
            Polled::Event(e) => Some(e.event_id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let broker = EventBroker::new();
        let report = broker.publish(&event(StreamId::generate(), b"x"));
        assert_eq!(report, FanoutReport::default());
        assert_eq!(broker.stream_count(), 0);
    }

    #[tokio::test]
    async fn single_subscriber_receives_events_in_order() {
        let broker = EventBroker::new();
        let stream_id = StreamId::generate();
        let (tx, mut rx) = subscriber_queue(16);
        broker.register(stream_id, tx);

        let published: Vec<_> = (0..5)
            .map(|_| {
                let e = event(stream_id, b"payload");
                broker.publish(&e);
                e.event_id
            })
            .collect();

        let mut received = Vec::new();
        while let Some(id) = next_id(&mut rx).await {
            received.push(id);
        }
        assert_eq!(received, published);
    }

    #[tokio::test]
    async fn fanout_reaches_every_subscriber_of_the_stream_only() {
        let broker = EventBroker::new();
        let s1 = StreamId::generate();
        let s2 = StreamId::generate();
        let (tx_a, mut rx_a) = subscriber_queue(8);
        let (tx_b, mut rx_b) = subscriber_queue(8);
        let (tx_other, mut rx_other) = subscriber_queue(8);
        broker.register(s1, tx_a);
        broker.register(s1, tx_b);
        broker.register(s2, tx_other);

        let e = event(s1, b"hello");
        let report = broker.publish(&e);
        assert_eq!(report.delivered, 2);

        assert_eq!(next_id(&mut rx_a).await, Some(e.event_id));
        assert_eq!(next_id(&mut rx_b).await, Some(e.event_id));
        assert_eq!(next_id(&mut rx_other).await, None);
    }

    #[tokio::test]
    async fn overflow_keeps_earliest_events() {
        let broker = EventBroker::new();
        let stream_id = StreamId::generate();
        let capacity = 3;
        let (tx, mut rx) = subscriber_queue(capacity);
        broker.register(stream_id, tx);

        let mut ids = Vec::new();
        let mut dropped = 0;
        for _ in 0..=capacity {
            let e = event(stream_id, b"burst");
            dropped += broker.publish(&e).dropped;
            ids.push(e.event_id);
        }
        assert_eq!(dropped, 1);

        let mut received = Vec::new();
        while let Some(id) = next_id(&mut rx).await {
            received.push(id);
        }
        assert_eq!(received, ids[..capacity].to_vec());
    }

    #[tokio::test]
    async fn deregistered_queue_receives_nothing() {
        let broker = EventBroker::new();
        let stream_id = StreamId::generate();
        let (tx, mut rx) = subscriber_queue(8);
        let sub = broker.register(stream_id, tx);

        assert!(broker.deregister(&sub));
        broker.publish(&event(stream_id, b"late"));

        assert!(matches!(rx.poll(WAIT).await, Polled::Closed));
        assert_eq!(broker.subscriber_count(stream_id), 0);
        assert_eq!(broker.stream_count(), 0);
    }

    #[tokio::test]
    async fn deregister_twice_is_noop() {
        let broker = EventBroker::new();
        let stream_id = StreamId::generate();
        let (tx_a, _rx_a) = subscriber_queue(8);
        let (tx_b, _rx_b) = subscriber_queue(8);
        let a = broker.register(stream_id, tx_a);
        broker.register(stream_id, tx_b);

        assert!(broker.deregister(&a));
        assert!(!broker.deregister(&a));
        assert_eq!(broker.subscriber_count(stream_id), 1);
    }

    #[tokio::test]
    async fn late_subscriber_does_not_see_earlier_events() {
        let broker = EventBroker::new();
        let s1 = StreamId::generate();
        let (tx_a, mut rx_a) = subscriber_queue(8);
        broker.register(s1, tx_a);

        let e1 = event(s1, b"E1");
        broker.publish(&e1);

        let (tx_b, mut rx_b) = subscriber_queue(8);
        broker.register(s1, tx_b);

        let e2 = event(s1, b"E2");
        broker.publish(&e2);

        assert_eq!(next_id(&mut rx_a).await, Some(e1.event_id));
        assert_eq!(next_id(&mut rx_a).await, Some(e2.event_id));
        assert_eq!(next_id(&mut rx_a).await, None);

        assert_eq!(next_id(&mut rx_b).await, Some(e2.event_id));
        assert_eq!(next_id(&mut rx_b).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_register_publish_deregister() {
        const STREAMS: usize = 100;
        const SUBSCRIBERS: usize = 10;

        let broker = create_event_broker();
        let mut handles = Vec::new();

        for _ in 0..STREAMS {
            let stream_id = StreamId::generate();
            for _ in 0..SUBSCRIBERS {
                let broker = broker.clone();
                handles.push(tokio::spawn(async move {
                    let (tx, mut rx) = subscriber_queue(64);
                    let sub = broker.register(stream_id, tx);
                    tokio::task::yield_now().await;
                    broker.deregister(&sub);
                    // Drain whatever arrived while registered; the queue
                    // must then report closed.
                    loop {
                        match rx.poll(Duration::from_millis(100)).await {
                            Polled::Event(e) => assert_eq!(e.stream_id, stream_id),
                            Polled::Closed => break,
                            Polled::Timeout => panic!("queue not closed after deregister"),
                        }
                    }
                }));
            }
            let broker = broker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..20 {
                    broker.publish(&event(stream_id, b"tick"));
                    tokio::task::yield_now().await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(broker.total_subscriptions(), 0);
        assert_eq!(broker.stream_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_subscriber_receives_every_event_published_while_registered() {
        const STREAMS: usize = 100;
        const SUBSCRIBERS: usize = 10;
        const EVENTS: usize = 20;

        let broker = create_event_broker();
        let mut registrations = Vec::new();
        for _ in 0..STREAMS {
            let stream_id = StreamId::generate();
            let mut receivers = Vec::new();
            for _ in 0..SUBSCRIBERS {
                let (tx, rx) = subscriber_queue(64);
                receivers.push((broker.register(stream_id, tx), rx));
            }
            registrations.push((stream_id, receivers));
        }
        assert_eq!(broker.total_subscriptions(), STREAMS * SUBSCRIBERS);

        let publishers: Vec<_> = registrations
            .iter()
            .map(|(stream_id, _)| {
                let broker = broker.clone();
                let stream_id = *stream_id;
                tokio::spawn(async move {
                    let mut published = Vec::with_capacity(EVENTS);
                    for _ in 0..EVENTS {
                        let e = event(stream_id, b"tick");
                        let report = broker.publish(&e);
                        assert_eq!(report.delivered, SUBSCRIBERS);
                        published.push(e.event_id);
                        tokio::task::yield_now().await;
                    }
                    published
                })
            })
            .collect();

        let mut expected = Vec::with_capacity(STREAMS);
        for publisher in publishers {
            expected.push(publisher.await.unwrap());
        }

        for ((_, receivers), published) in registrations.into_iter().zip(expected) {
            for (sub, mut rx) in receivers {
                broker.deregister(&sub);
                let mut received = Vec::with_capacity(EVENTS);
                loop {
                    match rx.poll(WAIT).await {
                        Polled::Event(e) => received.push(e.event_id),
                        Polled::Closed => break,
                        Polled::Timeout => panic!("queue not closed after deregister"),
                    }
                }
                assert_eq!(received, published);
            }
        }
        assert_eq!(broker.total_subscriptions(), 0);
    }
}
