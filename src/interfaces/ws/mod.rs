//! WebSocket interfaces
//!
//! - `frames`: JSON text frame codec
//! - `sessions`: subscribe, publish and bidirectional endpoints

pub mod frames;
pub mod sessions;

pub use frames::{ClientFrame, ServerFrame};
pub use sessions::{
    ws_bidirectional_handler, ws_publish_handler, ws_subscribe_handler, StreamingState,
};
