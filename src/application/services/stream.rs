//! Stream lifecycle use cases

use std::sync::Arc;

use tracing::info;

use crate::application::dto::{
    CreateStreamCommand, DeleteStreamResult, ListStreamsQuery, StreamView,
};
use crate::domain::{
    OwnerId, RepositoryProvider, Stream, StreamDomainService, StreamFilter, StreamId, StreamName,
    StreamStatus, StreamType,
};
use crate::shared::{DomainError, DomainResult, Page, PageLimits};

pub struct StreamService {
    repos: Arc<dyn RepositoryProvider>,
    domain: StreamDomainService,
    page_limits: PageLimits,
}

impl StreamService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self::with_page_limits(repos, PageLimits::default())
    }

    pub fn with_page_limits(repos: Arc<dyn RepositoryProvider>, page_limits: PageLimits) -> Self {
        Self {
            domain: StreamDomainService::new(repos.clone()),
            repos,
            page_limits,
        }
    }

    /// Create a stream in `Draft` status. Names are unique across all streams.
    pub async fn create(&self, cmd: CreateStreamCommand) -> DomainResult<StreamView> {
        let name = StreamName::parse(&cmd.name)?;
        let owner_id: OwnerId = cmd.owner_id.parse()?;
        let stream_type: StreamType = cmd.stream_type.parse()?;

        self.domain.ensure_name_unique(&name).await?;

        let stream = Stream::create(name, cmd.description, owner_id, stream_type);
        let saved = self.repos.streams().save(stream).await?;

        info!(
            stream_id = %saved.id(),
            name = %saved.name(),
            stream_type = %saved.stream_type(),
            "Stream created"
        );
        Ok(StreamView::from(saved))
    }

    pub async fn get(&self, stream_id: &str) -> DomainResult<StreamView> {
        let id: StreamId = stream_id.parse()?;
        let stream = self.domain.get_stream_or_err(id).await?;
        Ok(StreamView::from(stream))
    }

    pub async fn exists(&self, stream_id: StreamId) -> DomainResult<bool> {
        Ok(self.repos.streams().find_by_id(stream_id).await?.is_some())
    }

    pub async fn list(&self, query: ListStreamsQuery) -> DomainResult<Page<StreamView>> {
        let filter = StreamFilter {
            owner_id: query.owner_id.as_deref().map(str::parse).transpose()?,
            status: query.status.as_deref().map(str::parse).transpose()?,
            stream_type: query.stream_type.as_deref().map(str::parse).transpose()?,
        };
        let page = self.page_limits.request(query.page, query.size);

        let result = self.repos.streams().find_all(filter, page).await?;
        Ok(result.map(StreamView::from))
    }

    pub async fn activate(&self, stream_id: &str) -> DomainResult<StreamView> {
        self.transition(stream_id, Stream::activate).await
    }

    pub async fn deactivate(&self, stream_id: &str) -> DomainResult<StreamView> {
        self.transition(stream_id, Stream::deactivate).await
    }

    /// Soft delete: the stream is kept with status `Deleted`.
    pub async fn delete(&self, stream_id: &str) -> DomainResult<DeleteStreamResult> {
        self.transition(stream_id, Stream::soft_delete).await?;
        Ok(DeleteStreamResult {
            success: true,
            message: "Stream deleted successfully".to_string(),
        })
    }

    /// Replace name and description. A new name must not collide with
    /// another stream.
    pub async fn update_config(
        &self,
        stream_id: &str,
        name: &str,
        description: Option<String>,
    ) -> DomainResult<StreamView> {
        let id: StreamId = stream_id.parse()?;
        let name = StreamName::parse(name)?;
        let mut stream = self.domain.get_stream_or_err(id).await?;

        if stream.name() != &name {
            self.domain.ensure_name_unique(&name).await?;
        }
        stream.update_config(name, description)?;
        let saved = self.repos.streams().save(stream).await?;

        info!(stream_id = %id, name = %saved.name(), "Stream configuration updated");
        Ok(StreamView::from(saved))
    }

    /// Apply the transition implied by a requested target status.
    pub async fn transition_to(&self, stream_id: &str, target: StreamStatus) -> DomainResult<StreamView> {
        match target {
            StreamStatus::Active => self.activate(stream_id).await,
            StreamStatus::Inactive => self.deactivate(stream_id).await,
            StreamStatus::Deleted => self.transition(stream_id, Stream::soft_delete).await,
            StreamStatus::Draft => Err(DomainError::validation(
                "Cannot transition to status: DRAFT",
            )),
        }
    }

    async fn transition(
        &self,
        stream_id: &str,
        apply: fn(&mut Stream) -> DomainResult<()>,
    ) -> DomainResult<StreamView> {
        let id: StreamId = stream_id.parse()?;
        let mut stream = self.domain.get_stream_or_err(id).await?;
        let from = stream.status();
        apply(&mut stream)?;
        let saved = self.repos.streams().save(stream).await?;

        info!(
            stream_id = %id,
            from = %from,
            to = %saved.status(),
            "Stream status changed"
        );
        Ok(StreamView::from(saved))
    }
}
