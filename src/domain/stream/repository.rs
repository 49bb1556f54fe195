//! Stream repository interface

use async_trait::async_trait;

use super::model::{Stream, StreamFilter, StreamId, StreamName};
use crate::shared::{DomainResult, Page, PageRequest};

#[async_trait]
pub trait StreamRepository: Send + Sync {
    /// Insert or replace by id
    async fn save(&self, stream: Stream) -> DomainResult<Stream>;
    async fn find_by_id(&self, id: StreamId) -> DomainResult<Option<Stream>>;
    async fn find_all(&self, filter: StreamFilter, page: PageRequest) -> DomainResult<Page<Stream>>;
    async fn exists_by_name(&self, name: &StreamName) -> DomainResult<bool>;
}
