//! In-memory repository implementations

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    DataEvent, DataEventRepository, RepositoryProvider, Stream, StreamFilter, StreamId, StreamName,
    StreamRepository,
};
use crate::shared::{DomainResult, Page, PageRequest};

/// Stream storage for development and testing
#[derive(Default)]
pub struct InMemoryStreamRepository {
    streams: DashMap<StreamId, Stream>,
}

impl InMemoryStreamRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamRepository for InMemoryStreamRepository {
    async fn save(&self, stream: Stream) -> DomainResult<Stream> {
        self.streams.insert(stream.id(), stream.clone());
        Ok(stream)
    }

    async fn find_by_id(&self, id: StreamId) -> DomainResult<Option<Stream>> {
        Ok(self.streams.get(&id).map(|s| s.value().clone()))
    }

    async fn find_all(&self, filter: StreamFilter, page: PageRequest) -> DomainResult<Page<Stream>> {
        let mut matching: Vec<Stream> = self
            .streams
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset())
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn exists_by_name(&self, name: &StreamName) -> DomainResult<bool> {
        Ok(self.streams.iter().any(|entry| entry.value().name() == name))
    }
}

/// Event storage for development and testing.
///
/// Events are kept per stream in insertion order.
#[derive(Default)]
pub struct InMemoryDataEventRepository {
    events: DashMap<StreamId, Vec<DataEvent>>,
}

impl InMemoryDataEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, stream_id: StreamId) -> usize {
        self.events.get(&stream_id).map_or(0, |v| v.len())
    }
}

#[async_trait]
impl DataEventRepository for InMemoryDataEventRepository {
    async fn save(&self, event: DataEvent) -> DomainResult<DataEvent> {
        self.events
            .entry(event.stream_id)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    async fn find_by_stream_id(&self, stream_id: StreamId, page: PageRequest) -> DomainResult<Page<DataEvent>> {
        let Some(events) = self.events.get(&stream_id) else {
            return Ok(Page::new(Vec::new(), page, 0));
        };
        let total = events.len() as u64;
        let items = events
            .iter()
            .rev()
            .skip(page.offset())
            .take(page.size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, page, total))
    }
}

/// [`RepositoryProvider`] backed entirely by process memory
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    streams: InMemoryStreamRepository,
    events: InMemoryDataEventRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn event_store(&self) -> &InMemoryDataEventRepository {
        &self.events
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn streams(&self) -> &dyn StreamRepository {
        &self.streams
    }

    fn events(&self) -> &dyn DataEventRepository {
        &self.events
    }
}
