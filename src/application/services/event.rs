//! Event acceptance: validate, persist, then hand to live subscribers

use std::sync::Arc;

use tracing::debug;

use crate::application::dto::PublishEventCommand;
use crate::application::ports::EventPublisher;
use crate::domain::{DataEvent, EventPayload, RepositoryProvider, StreamDomainService, StreamId};
use crate::shared::{DomainResult, Page, PageLimits};

pub struct EventService {
    repos: Arc<dyn RepositoryProvider>,
    domain: StreamDomainService,
    publisher: Arc<dyn EventPublisher>,
    page_limits: PageLimits,
}

impl EventService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self::with_page_limits(repos, publisher, PageLimits::default())
    }

    pub fn with_page_limits(
        repos: Arc<dyn RepositoryProvider>,
        publisher: Arc<dyn EventPublisher>,
        page_limits: PageLimits,
    ) -> Self {
        Self {
            domain: StreamDomainService::new(repos.clone()),
            repos,
            publisher,
            page_limits,
        }
    }

    /// Accept one event for an active stream.
    ///
    /// The event is stored before it is offered to subscribers, so anything a
    /// subscriber sees is already persisted. Returns the stored event with its
    /// server-assigned id and timestamp.
    pub async fn publish(&self, cmd: PublishEventCommand) -> DomainResult<Arc<DataEvent>> {
        let stream_id: StreamId = cmd.stream_id.parse()?;
        self.domain.ensure_active(stream_id).await?;

        let payload = EventPayload::new(cmd.payload)?;
        let event = DataEvent::new(stream_id, payload, cmd.metadata);
        let saved = Arc::new(self.repos.events().save(event).await?);

        let report = self.publisher.publish(&saved);
        metrics::counter!("datastream_events_accepted_total").increment(1);
        debug!(
            stream_id = %stream_id,
            event_id = %saved.event_id,
            size = saved.payload.len(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Event accepted"
        );
        Ok(saved)
    }

    /// Stored events of a stream, newest first.
    pub async fn list_for_stream(
        &self,
        stream_id: &str,
        page: Option<u32>,
        size: Option<u32>,
    ) -> DomainResult<Page<DataEvent>> {
        let stream_id: StreamId = stream_id.parse()?;
        self.domain.get_stream_or_err(stream_id).await?;
        let request = self.page_limits.request(page, size);
        self.repos.events().find_by_stream_id(stream_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::application::dto::CreateStreamCommand;
    use crate::application::ports::FanoutReport;
    use crate::application::services::StreamService;
    use crate::domain::MAX_PAYLOAD_BYTES;
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::{DomainError, ErrorKind};

    #[derive(Default)]
    struct CapturingPublisher {
        published: Mutex<Vec<Uuid>>,
    }

    impl EventPublisher for CapturingPublisher {
        fn publish(&self, event: &Arc<DataEvent>) -> FanoutReport {
            self.published.lock().unwrap().push(event.event_id);
            FanoutReport::default()
        }
    }

    struct Fixture {
        streams: StreamService,
        events: EventService,
        publisher: Arc<CapturingPublisher>,
        repos: Arc<InMemoryRepositoryProvider>,
    }

    fn fixture() -> Fixture {
        let repos = InMemoryRepositoryProvider::shared();
        let publisher = Arc::new(CapturingPublisher::default());
        Fixture {
            streams: StreamService::new(repos.clone()),
            events: EventService::new(repos.clone(), publisher.clone()),
            publisher,
            repos,
        }
    }

    async fn stream(f: &Fixture, activate: bool) -> String {
        let id = f
            .streams
            .create(CreateStreamCommand {
                name: format!("s-{}", Uuid::new_v4()),
                description: None,
                owner_id: Uuid::new_v4().to_string(),
                stream_type: "LOG".into(),
            })
            .await
            .unwrap()
            .id
            .to_string();
        if activate {
            f.streams.activate(&id).await.unwrap();
        }
        id
    }

    #[tokio::test]
    async fn accepted_event_is_stored_then_published() {
        let f = fixture();
        let id = stream(&f, true).await;

        let cmd = PublishEventCommand::new(id.clone(), &b"hello"[..]).with_metadata("k", "v");
        let event = f.events.publish(cmd).await.unwrap();

        assert_eq!(event.metadata.get("k").map(String::as_str), Some("v"));
        assert_eq!(*f.publisher.published.lock().unwrap(), vec![event.event_id]);
        assert_eq!(f.repos.event_store().count(event.stream_id), 1);
    }

    #[tokio::test]
    async fn missing_stream_is_not_found_and_nothing_published() {
        let f = fixture();
        let err = f
            .events
            .publish(PublishEventCommand::new(Uuid::new_v4().to_string(), &b"x"[..]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(f.publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn draft_stream_rejects_events() {
        let f = fixture();
        let id = stream(&f, false).await;
        let err = f
            .events
            .publish(PublishEventCommand::new(id, &b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert!(f.publisher.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected() {
        let f = fixture();
        let id = stream(&f, true).await;
        let err = f
            .events
            .publish(PublishEventCommand::new(id, vec![0u8; MAX_PAYLOAD_BYTES + 1]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);
    }

    #[tokio::test]
    async fn list_for_stream_pages_stored_events() {
        let f = fixture();
        let id = stream(&f, true).await;
        for _ in 0..3 {
            f.events
                .publish(PublishEventCommand::new(id.clone(), &b"e"[..]))
                .await
                .unwrap();
        }
        let page = f.events.list_for_stream(&id, Some(0), Some(2)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        let err = f
            .events
            .list_for_stream(&Uuid::new_v4().to_string(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
