//! Repository traits for the domain layer
//!
//! `RepositoryProvider` gives unified access to the per-aggregate
//! repositories; consumers ask only for the one they need:
//!
//! ```ignore
//! async fn handle(repos: &dyn RepositoryProvider, id: StreamId) -> DomainResult<()> {
//!     let stream = repos.streams().find_by_id(id).await?;
//!     let events = repos.events().find_by_stream_id(id, PageRequest::new(0, 20)?).await?;
//!     Ok(())
//! }
//! ```

use super::event::DataEventRepository;
use super::stream::StreamRepository;

pub trait RepositoryProvider: Send + Sync {
    fn streams(&self) -> &dyn StreamRepository;
    fn events(&self) -> &dyn DataEventRepository;
}
