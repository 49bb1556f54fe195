//! Commands and queries accepted by the application services
//!
//! Identifiers and enum values arrive as raw strings from the transport and
//! are parsed by the services, so a malformed value surfaces as a
//! validation error rather than a transport decoding failure.

use std::collections::HashMap;

use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct CreateStreamCommand {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub stream_type: String,
}

/// Partial update. An absent field is left unchanged, except that setting
/// a name without a description clears the description.
#[derive(Debug, Clone, Default)]
pub struct UpdateStreamCommand {
    pub stream_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListStreamsQuery {
    pub owner_id: Option<String>,
    pub status: Option<String>,
    pub stream_type: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PublishEventCommand {
    pub stream_id: String,
    pub payload: Bytes,
    pub metadata: HashMap<String, String>,
}

impl PublishEventCommand {
    pub fn new(stream_id: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            stream_id: stream_id.into(),
            payload: payload.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
