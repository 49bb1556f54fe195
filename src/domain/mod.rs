pub mod event;
pub mod repositories;
pub mod services;
pub mod stream;

// Re-export commonly used types
pub use event::{DataEvent, DataEventRepository, EventPayload, MAX_PAYLOAD_BYTES};
pub use repositories::RepositoryProvider;
pub use services::StreamDomainService;
pub use stream::{
    OwnerId, Stream, StreamFilter, StreamId, StreamName, StreamRepository, StreamStatus,
    StreamType,
};

pub use crate::shared::{DomainError, DomainResult};
