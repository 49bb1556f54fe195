//! Application layer - use cases and the streaming core

pub mod dto;
pub mod ports;
pub mod services;
pub mod streaming;

pub use ports::{EventPublisher, FanoutReport, ObserverClosed, ResponseObserver};
pub use services::{EventService, StreamService};
pub use streaming::{create_event_broker, EventBroker, SharedEventBroker};
