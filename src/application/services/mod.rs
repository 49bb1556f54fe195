//! Application services

mod event;
mod stream;

pub use event::EventService;
pub use stream::StreamService;
