//! # Datastream
//!
//! Stream event broker: named streams with a lifecycle, persisted events,
//! and live fanout to subscribers with per-subscriber bounded queues.
//!
//! ## Architecture
//!
//! - **domain**: streams, events, repository traits
//! - **application**: use cases and the streaming core (broker, queues,
//!   delivery loops)
//! - **infrastructure**: in-memory repositories
//! - **interfaces**: the streaming gateway (unary, server streaming, client
//!   streaming, bidirectional) and its HTTP/WebSocket transport
//! - **shared**: errors, pagination, shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use interfaces::gateway::{GatewayError, GatewaySettings, StreamGateway};
pub use interfaces::http::create_api_router;
pub use server::{ServerHandle, ServerOptions};
