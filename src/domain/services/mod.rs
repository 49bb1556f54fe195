//! Domain rules that span more than one aggregate instance

use std::sync::Arc;

use super::repositories::RepositoryProvider;
use super::stream::{Stream, StreamId, StreamName};
use crate::shared::{DomainError, DomainResult};

#[derive(Clone)]
pub struct StreamDomainService {
    repos: Arc<dyn RepositoryProvider>,
}

impl StreamDomainService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Fails with `StreamAlreadyExists` if any stream (deleted included)
    /// already uses `name`.
    pub async fn ensure_name_unique(&self, name: &StreamName) -> DomainResult<()> {
        if self.repos.streams().exists_by_name(name).await? {
            return Err(DomainError::StreamAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    pub async fn get_stream_or_err(&self, id: StreamId) -> DomainResult<Stream> {
        self.repos
            .streams()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::StreamNotFound(id.to_string()))
    }

    /// Gate for accepting events: the stream must exist and be `Active`.
    pub async fn ensure_active(&self, id: StreamId) -> DomainResult<Stream> {
        let stream = self.get_stream_or_err(id).await?;
        if !stream.is_active() {
            return Err(DomainError::InvalidState(format!(
                "Stream {} is not active (status: {})",
                id,
                stream.status()
            )));
        }
        Ok(stream)
    }
}
