//! Read models returned by the application services

use chrono::{DateTime, Utc};

use crate::domain::{OwnerId, Stream, StreamId, StreamStatus, StreamType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamView {
    pub id: StreamId,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: OwnerId,
    pub stream_type: StreamType,
    pub status: StreamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Stream> for StreamView {
    fn from(stream: &Stream) -> Self {
        Self {
            id: stream.id(),
            name: stream.name().to_string(),
            description: stream.description().map(String::from),
            owner_id: stream.owner_id(),
            stream_type: stream.stream_type(),
            status: stream.status(),
            created_at: stream.created_at(),
            updated_at: stream.updated_at(),
        }
    }
}

impl From<Stream> for StreamView {
    fn from(stream: Stream) -> Self {
        Self::from(&stream)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStreamResult {
    pub success: bool,
    pub message: String,
}

/// Final response of a client-streaming publish session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub events_accepted: u64,
    pub message: String,
}

impl PublishSummary {
    pub fn new(events_accepted: u64) -> Self {
        Self {
            events_accepted,
            message: format!("Published {} event(s) successfully", events_accepted),
        }
    }
}
