//! In-process streaming core: bounded subscriber queues, the event broker
//! and per-subscription delivery loops.

pub mod broker;
pub mod delivery;
pub mod queue;

pub use broker::{create_event_broker, EventBroker, SharedEventBroker, Subscription, SubscriptionId};
pub use delivery::{DeliveryExit, DeliveryLoop, SubscriptionGuard, DEFAULT_POLL_INTERVAL};
pub use queue::{subscriber_queue, Polled, QueueReceiver, QueueSender, DEFAULT_QUEUE_CAPACITY};
