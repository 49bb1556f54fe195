//! Interface layer: the transport-neutral gateway and its HTTP/WebSocket
//! adapter

pub mod gateway;
pub mod http;
pub mod ws;
