//! Delivery loop: one task per subscription draining its queue into the
//! subscriber's transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, info_span, Instrument};

use super::broker::{SharedEventBroker, Subscription};
use super::queue::{Polled, QueueReceiver};
use crate::application::ports::ResponseObserver;
use crate::domain::DataEvent;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Why a delivery loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryExit {
    /// Subscriber cancelled or the server is shutting down
    Cancelled,
    /// Forwarding an event to the transport failed
    TransportClosed,
    /// The subscription was removed from the broker by someone else
    Deregistered,
}

/// Deregisters its subscription when dropped.
///
/// Held by the delivery loop so that every exit path, including the task
/// being aborted, removes the queue from the broker.
pub struct SubscriptionGuard {
    broker: SharedEventBroker,
    subscription: Subscription,
}

impl SubscriptionGuard {
    pub fn new(broker: SharedEventBroker, subscription: Subscription) -> Self {
        Self {
            broker,
            subscription,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.broker.deregister(&self.subscription);
    }
}

pub struct DeliveryLoop<O> {
    guard: SubscriptionGuard,
    queue: QueueReceiver,
    observer: Arc<O>,
    poll_interval: Duration,
}

impl<O> DeliveryLoop<O>
where
    O: ResponseObserver<Arc<DataEvent>> + 'static,
{
    pub fn new(
        broker: SharedEventBroker,
        subscription: Subscription,
        queue: QueueReceiver,
        observer: Arc<O>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            guard: SubscriptionGuard::new(broker, subscription),
            queue,
            observer,
            poll_interval,
        }
    }

    /// Forward events until cancelled, the transport fails or the queue is
    /// closed. The subscription is deregistered before this returns.
    pub async fn run(self) -> DeliveryExit {
        let Self {
            guard,
            mut queue,
            observer,
            poll_interval,
        } = self;
        let mut forwarded: u64 = 0;

        let exit = loop {
            if observer.is_cancelled() {
                break DeliveryExit::Cancelled;
            }
            match queue.poll(poll_interval).await {
                Polled::Event(event) => {
                    if observer.is_cancelled() {
                        break DeliveryExit::Cancelled;
                    }
                    if observer.send(event).await.is_err() {
                        break DeliveryExit::TransportClosed;
                    }
                    forwarded += 1;
                }
                Polled::Timeout => {}
                Polled::Closed if observer.is_cancelled() => break DeliveryExit::Cancelled,
                Polled::Closed => break DeliveryExit::Deregistered,
            }
        };

        let stream_id = guard.subscription().stream_id();
        let subscription_id = guard.subscription().id();
        drop(guard);
        info!(
            stream_id = %stream_id,
            subscription_id = %subscription_id,
            forwarded,
            exit = ?exit,
            "Delivery loop finished"
        );
        exit
    }

    pub fn spawn(self) -> JoinHandle<DeliveryExit> {
        let span = info_span!(
            "delivery",
            stream_id = %self.guard.subscription().stream_id(),
            subscription_id = %self.guard.subscription().id(),
        );
        tokio::spawn(self.run().instrument(span))
    }
}
