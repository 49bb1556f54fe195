//! Streams module: stream CRUD and stored-event listing

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
