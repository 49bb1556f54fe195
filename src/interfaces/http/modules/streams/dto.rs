//! Stream and event DTOs

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::{
    CreateStreamCommand, DeleteStreamResult, ListStreamsQuery, StreamView, UpdateStreamCommand,
};
use crate::domain::DataEvent;
use crate::shared::Page;

#[derive(Debug, Serialize, ToSchema)]
pub struct StreamDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    /// EVENT, LOG, METRIC or CUSTOM
    pub stream_type: String,
    /// DRAFT, ACTIVE, INACTIVE or DELETED
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StreamView> for StreamDto {
    fn from(v: StreamView) -> Self {
        Self {
            id: v.id.as_uuid(),
            name: v.name,
            description: v.description,
            owner_id: v.owner_id.as_uuid(),
            stream_type: v.stream_type.to_string(),
            status: v.status.to_string(),
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStreamRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub owner_id: String,
    #[serde(default = "default_stream_type")]
    pub stream_type: String,
}

fn default_stream_type() -> String {
    "EVENT".to_string()
}

impl From<CreateStreamRequest> for CreateStreamCommand {
    fn from(r: CreateStreamRequest) -> Self {
        Self {
            name: r.name,
            description: r.description,
            owner_id: r.owner_id,
            stream_type: r.stream_type,
        }
    }
}

/// Partial update; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStreamRequest {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Target status: ACTIVE, INACTIVE or DELETED
    pub status: Option<String>,
}

impl UpdateStreamRequest {
    pub fn into_command(self, stream_id: String) -> UpdateStreamCommand {
        UpdateStreamCommand {
            stream_id,
            name: self.name,
            description: self.description,
            status: self.status,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListStreamsParams {
    pub owner_id: Option<String>,
    pub status: Option<String>,
    pub stream_type: Option<String>,
    /// Zero-based page index
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl From<ListStreamsParams> for ListStreamsQuery {
    fn from(p: ListStreamsParams) -> Self {
        Self {
            owner_id: p.owner_id,
            status: p.status,
            stream_type: p.stream_type,
            page: p.page,
            size: p.size,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// A stored or delivered event. `payload` is base64.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DataEventDto {
    pub event_id: Uuid,
    pub stream_id: Uuid,
    pub payload: String,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl From<&DataEvent> for DataEventDto {
    fn from(e: &DataEvent) -> Self {
        Self {
            event_id: e.event_id,
            stream_id: e.stream_id.as_uuid(),
            payload: BASE64.encode(e.payload.as_bytes()),
            metadata: e.metadata.clone(),
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PageDto<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> PageDto<T> {
    pub fn from_page<S>(page: Page<S>, f: impl FnMut(S) -> T) -> Self {
        let total_pages = page.total_pages();
        let Page {
            items,
            page,
            size,
            total,
        } = page;
        Self {
            items: items.into_iter().map(f).collect(),
            page,
            size,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteStreamResponse {
    pub success: bool,
    pub message: String,
}

impl From<DeleteStreamResult> for DeleteStreamResponse {
    fn from(r: DeleteStreamResult) -> Self {
        Self {
            success: r.success,
            message: r.message,
        }
    }
}
