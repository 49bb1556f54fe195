//! Stream aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::{DomainError, DomainResult};

pub const MAX_STREAM_NAME_LEN: usize = 255;

/// Unique stream identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for StreamId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for StreamId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::validation(format!("Invalid stream id: {}", s)))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the user owning a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for OwnerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for OwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| DomainError::validation(format!("Invalid owner id: {}", s)))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Trimmed, non-blank stream name of at most 255 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamName(String);

impl StreamName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("Stream name must not be blank"));
        }
        if trimmed.chars().count() > MAX_STREAM_NAME_LEN {
            return Err(DomainError::validation(format!(
                "Stream name must not exceed {} characters",
                MAX_STREAM_NAME_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of data flowing through a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    Event,
    Log,
    Metric,
    Custom,
}

impl StreamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "EVENT",
            Self::Log => "LOG",
            Self::Metric => "METRIC",
            Self::Custom => "CUSTOM",
        }
    }
}

impl FromStr for StreamType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EVENT" => Ok(Self::Event),
            "LOG" => Ok(Self::Log),
            "METRIC" => Ok(Self::Metric),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(DomainError::validation(format!("Unknown stream type: {}", other))),
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream lifecycle status
///
/// ```text
/// DRAFT ──► ACTIVE ◄──► INACTIVE
///   └─────────┴────────────┴──► DELETED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamStatus {
    Draft,
    Active,
    Inactive,
    Deleted,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Deleted => "DELETED",
        }
    }
}

impl FromStr for StreamStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            "DELETED" => Ok(Self::Deleted),
            other => Err(DomainError::validation(format!("Unknown stream status: {}", other))),
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream aggregate root.
///
/// State changes go through the lifecycle methods so the status machine
/// cannot be bypassed.
#[derive(Debug, Clone)]
pub struct Stream {
    id: StreamId,
    name: StreamName,
    description: Option<String>,
    owner_id: OwnerId,
    stream_type: StreamType,
    status: StreamStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Stream {
    /// New stream in `Draft` status
    pub fn create(
        name: StreamName,
        description: Option<String>,
        owner_id: OwnerId,
        stream_type: StreamType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: StreamId::generate(),
            name,
            description,
            owner_id,
            stream_type,
            status: StreamStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn activate(&mut self) -> DomainResult<()> {
        match self.status {
            StreamStatus::Draft | StreamStatus::Inactive => {
                self.set_status(StreamStatus::Active);
                Ok(())
            }
            other => Err(DomainError::InvalidState(format!(
                "Cannot activate stream from status {}. Allowed from: DRAFT, INACTIVE",
                other
            ))),
        }
    }

    pub fn deactivate(&mut self) -> DomainResult<()> {
        if self.status != StreamStatus::Active {
            return Err(DomainError::InvalidState(format!(
                "Cannot deactivate stream from status {}. Allowed from: ACTIVE",
                self.status
            )));
        }
        self.set_status(StreamStatus::Inactive);
        Ok(())
    }

    pub fn soft_delete(&mut self) -> DomainResult<()> {
        if self.status == StreamStatus::Deleted {
            return Err(DomainError::InvalidState(
                "Stream is already in DELETED status".to_string(),
            ));
        }
        self.set_status(StreamStatus::Deleted);
        Ok(())
    }

    /// Replace name and description. Not allowed once deleted.
    pub fn update_config(&mut self, name: StreamName, description: Option<String>) -> DomainResult<()> {
        if self.status == StreamStatus::Deleted {
            return Err(DomainError::InvalidOperation(
                "Cannot update configuration of a DELETED stream".to_string(),
            ));
        }
        self.name = name;
        self.description = description;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn set_status(&mut self, status: StreamStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn is_active(&self) -> bool {
        self.status == StreamStatus::Active
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn name(&self) -> &StreamName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Optional criteria for listing streams; `None` matches anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFilter {
    pub owner_id: Option<OwnerId>,
    pub status: Option<StreamStatus>,
    pub stream_type: Option<StreamType>,
}

impl StreamFilter {
    pub fn matches(&self, stream: &Stream) -> bool {
        self.owner_id.map_or(true, |o| o == stream.owner_id)
            && self.status.map_or(true, |s| s == stream.status)
            && self.stream_type.map_or(true, |t| t == stream.stream_type)
    }
}
