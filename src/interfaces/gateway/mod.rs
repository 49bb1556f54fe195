//! Transport-neutral streaming gateway
//!
//! - `service`: the four interaction shapes (unary, server streaming,
//!   client streaming, bidirectional)
//! - `observer`: channel-backed response observer shared by all shapes
//! - `error`: session-level errors

pub mod error;
pub mod observer;
pub mod service;

pub use error::GatewayError;
pub use observer::{response_channel, ChannelObserver, ResponseStream};
pub use service::{GatewaySettings, StreamGateway, SubscriptionHandle};
