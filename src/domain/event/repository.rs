//! Data event repository interface

use async_trait::async_trait;

use super::model::DataEvent;
use crate::domain::stream::StreamId;
use crate::shared::{DomainResult, Page, PageRequest};

#[async_trait]
pub trait DataEventRepository: Send + Sync {
    async fn save(&self, event: DataEvent) -> DomainResult<DataEvent>;
    /// Events of one stream, newest first
    async fn find_by_stream_id(&self, stream_id: StreamId, page: PageRequest) -> DomainResult<Page<DataEvent>>;
}
