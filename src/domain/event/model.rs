//! Data event entity

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::stream::StreamId;
use crate::shared::{DomainError, DomainResult};

/// Largest accepted payload: 1 MiB
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Opaque event body. Cloning shares the underlying buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct EventPayload(Bytes);

impl EventPayload {
    pub fn new(bytes: impl Into<Bytes>) -> DomainResult<Self> {
        let bytes = bytes.into();
        if bytes.len() > MAX_PAYLOAD_BYTES {
            return Err(DomainError::PayloadTooLarge {
                size: bytes.len(),
                limit: MAX_PAYLOAD_BYTES,
            });
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EventPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventPayload[size={}]", self.0.len())
    }
}

/// One immutable unit of data published to a stream.
///
/// Built once when an event is accepted and then shared behind an `Arc`
/// between storage, the broker and every subscriber queue.
#[derive(Debug, Clone)]
pub struct DataEvent {
    pub event_id: Uuid,
    pub stream_id: StreamId,
    pub payload: EventPayload,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl DataEvent {
    pub fn new(stream_id: StreamId, payload: EventPayload, metadata: HashMap<String, String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            stream_id,
            payload,
            metadata,
            created_at: Utc::now(),
        }
    }
}
