//! Streaming gateway: the four interaction shapes on top of the stream
//! services and the event broker.
//!
//! | shape            | entry point                 |
//! |------------------|-----------------------------|
//! | unary            | `create_stream` … `list_streams` |
//! | server streaming | [`StreamGateway::subscribe`] |
//! | client streaming | [`StreamGateway::publish_stream`] |
//! | bidirectional    | [`StreamGateway::stream_bidirectional`] |

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::error::GatewayError;
use super::observer::{response_channel, ChannelObserver, ResponseStream};
use crate::application::dto::{
    CreateStreamCommand, DeleteStreamResult, ListStreamsQuery, PublishEventCommand,
    PublishSummary, StreamView, UpdateStreamCommand,
};
use crate::application::ports::{ObserverClosed, ResponseObserver};
use crate::application::streaming::{
    subscriber_queue, DeliveryExit, DeliveryLoop, SharedEventBroker, Subscription,
    DEFAULT_POLL_INTERVAL, DEFAULT_QUEUE_CAPACITY,
};
use crate::application::{EventService, StreamService};
use crate::domain::{DataEvent, StreamId, StreamStatus};
use crate::shared::{DomainError, DomainResult, Page};

/// Tunables for streaming sessions
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Capacity of each subscriber queue
    pub queue_capacity: usize,
    /// Upper bound on how long a delivery loop waits before re-checking
    /// cancellation
    pub poll_interval: Duration,
    /// Items buffered between a session and its transport
    pub response_buffer: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            response_buffer: 256,
        }
    }
}

/// A live server-streaming subscription.
///
/// Events arrive on [`SubscriptionHandle::recv`]. Dropping the handle
/// cancels the subscription; the delivery loop then deregisters it.
pub struct SubscriptionHandle {
    subscription: Subscription,
    responses: ResponseStream<Arc<DataEvent>>,
    task: JoinHandle<DeliveryExit>,
}

impl SubscriptionHandle {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub async fn recv(&mut self) -> Option<Arc<DataEvent>> {
        self.responses.recv().await
    }

    pub fn cancel(&self) {
        self.responses.cancel();
    }

    /// Resolves when the subscription is cancelled by the client side or by
    /// server shutdown.
    pub async fn cancelled(&self) {
        self.responses.cancelled().await;
    }

    /// Cancel and wait for the delivery loop to finish.
    pub async fn close(self) -> Option<DeliveryExit> {
        self.responses.cancel();
        self.task.await.ok()
    }
}

pub struct StreamGateway {
    streams: Arc<StreamService>,
    events: Arc<EventService>,
    broker: SharedEventBroker,
    settings: GatewaySettings,
    shutdown: CancellationToken,
}

impl StreamGateway {
    pub fn new(
        streams: Arc<StreamService>,
        events: Arc<EventService>,
        broker: SharedEventBroker,
        settings: GatewaySettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            streams,
            events,
            broker,
            settings,
            shutdown,
        }
    }

    pub fn broker(&self) -> &SharedEventBroker {
        &self.broker
    }

    pub fn events(&self) -> &EventService {
        &self.events
    }

    /// Response channel for a transport session, cancelled on shutdown.
    pub fn open_responses<T: Send + 'static>(
        &self,
    ) -> (Arc<ChannelObserver<T>>, ResponseStream<T>) {
        response_channel(self.settings.response_buffer, &self.shutdown)
    }

    /// Token cancelled when the server starts shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    // ── Unary ──────────────────────────────────────────────────

    pub async fn create_stream(&self, cmd: CreateStreamCommand) -> DomainResult<StreamView> {
        self.streams.create(cmd).await
    }

    pub async fn get_stream(&self, stream_id: &str) -> DomainResult<StreamView> {
        self.streams.get(stream_id).await
    }

    pub async fn list_streams(&self, query: ListStreamsQuery) -> DomainResult<Page<StreamView>> {
        self.streams.list(query).await
    }

    /// Apply an optional status transition, then an optional configuration
    /// change, and return the stream as stored afterwards.
    pub async fn update_stream(&self, cmd: UpdateStreamCommand) -> DomainResult<StreamView> {
        if let Some(status) = cmd.status.as_deref() {
            let target: StreamStatus = status.parse()?;
            self.streams.transition_to(&cmd.stream_id, target).await?;
        }

        match (cmd.name, cmd.description) {
            (Some(name), description) => {
                self.streams
                    .update_config(&cmd.stream_id, &name, description)
                    .await?;
            }
            (None, Some(description)) => {
                let current = self.streams.get(&cmd.stream_id).await?;
                self.streams
                    .update_config(&cmd.stream_id, &current.name, Some(description))
                    .await?;
            }
            (None, None) => {}
        }

        self.streams.get(&cmd.stream_id).await
    }

    pub async fn delete_stream(&self, stream_id: &str) -> DomainResult<DeleteStreamResult> {
        self.streams.delete(stream_id).await
    }

    // ── Server streaming ───────────────────────────────────────

    /// Start a subscription delivering every event published to the stream
    /// from now on. Returns as soon as the subscription is registered.
    pub async fn subscribe(&self, stream_id: &str) -> DomainResult<SubscriptionHandle> {
        let (observer, responses) =
            response_channel(self.settings.response_buffer, &self.shutdown);
        let (subscription, task) = self.subscribe_with(stream_id, observer).await?;
        Ok(SubscriptionHandle {
            subscription,
            responses,
            task,
        })
    }

    /// Same as [`subscribe`](Self::subscribe) but delivering into a
    /// caller-supplied observer.
    ///
    /// Fails with `StreamNotFound` before anything is registered if the
    /// stream does not exist.
    pub async fn subscribe_with<O>(
        &self,
        stream_id: &str,
        observer: Arc<O>,
    ) -> DomainResult<(Subscription, JoinHandle<DeliveryExit>)>
    where
        O: ResponseObserver<Arc<DataEvent>> + 'static,
    {
        let id: StreamId = stream_id.parse()?;
        if !self.streams.exists(id).await? {
            return Err(DomainError::StreamNotFound(id.to_string()));
        }

        let (queue_tx, queue_rx) = subscriber_queue(self.settings.queue_capacity);
        let subscription = self.broker.register(id, queue_tx);

        let broker = self.broker.clone();
        let on_cancel = subscription.clone();
        observer.on_cancel(Box::new(move || {
            broker.deregister(&on_cancel);
        }));

        let task = DeliveryLoop::new(
            self.broker.clone(),
            subscription.clone(),
            queue_rx,
            observer,
            self.settings.poll_interval,
        )
        .spawn();

        Ok((subscription, task))
    }

    // ── Client streaming ───────────────────────────────────────

    /// Accept every inbound event in order and answer once, after the
    /// client completes, with the number accepted.
    ///
    /// The first failure (an inbound error or a rejected event) aborts the
    /// whole session; events accepted before it stay accepted.
    pub async fn publish_stream<S>(&self, inbound: S) -> Result<PublishSummary, GatewayError>
    where
        S: Stream<Item = Result<PublishEventCommand, GatewayError>> + Send,
    {
        futures_util::pin_mut!(inbound);
        let mut accepted: u64 = 0;

        while let Some(item) = inbound.next().await {
            let result = match item {
                Ok(cmd) => self.events.publish(cmd).await.map_err(GatewayError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(accepted, error = %e, "Client-streaming publish aborted");
                return Err(e);
            }
            accepted += 1;
        }

        info!(accepted, "Client-streaming publish completed");
        Ok(PublishSummary::new(accepted))
    }

    // ── Bidirectional ──────────────────────────────────────────

    /// Accept each inbound event and immediately echo the stored event
    /// (with its server-assigned id and timestamp) to `outbound`.
    ///
    /// Exactly one echo per accepted event, in arrival order. Returns the
    /// number of echoes once the inbound side completes; the first failure
    /// aborts the session.
    pub async fn stream_bidirectional<S, O>(
        &self,
        inbound: S,
        outbound: Arc<O>,
    ) -> Result<u64, GatewayError>
    where
        S: Stream<Item = Result<PublishEventCommand, GatewayError>> + Send,
        O: ResponseObserver<Arc<DataEvent>> + ?Sized,
    {
        futures_util::pin_mut!(inbound);
        let mut echoed: u64 = 0;

        while let Some(item) = inbound.next().await {
            if outbound.is_cancelled() {
                return Err(GatewayError::Closed(ObserverClosed));
            }
            let result = match item {
                Ok(cmd) => match self.events.publish(cmd).await {
                    Ok(event) => outbound.send(event).await.map_err(GatewayError::from),
                    Err(e) => Err(GatewayError::from(e)),
                },
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(echoed, error = %e, "Bidirectional session aborted");
                return Err(e);
            }
            echoed += 1;
        }

        info!(echoed, "Bidirectional session completed");
        Ok(echoed)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use uuid::Uuid;

    use super::*;
    use crate::application::create_event_broker;
    use crate::infrastructure::InMemoryRepositoryProvider;
    use crate::shared::ErrorKind;

    const WAIT: Duration = Duration::from_secs(1);

    struct Fixture {
        gateway: StreamGateway,
        shutdown: CancellationToken,
    }

    fn fixture() -> Fixture {
        let repos = InMemoryRepositoryProvider::shared();
        let broker = create_event_broker();
        let streams = Arc::new(StreamService::new(repos.clone()));
        let events = Arc::new(EventService::new(repos, broker.clone()));
        let shutdown = CancellationToken::new();
        let settings = GatewaySettings {
            poll_interval: Duration::from_millis(20),
            ..Default::default()
        };
        Fixture {
            gateway: StreamGateway::new(streams, events, broker, settings, shutdown.clone()),
            shutdown,
        }
    }

    async fn active_stream(gateway: &StreamGateway) -> String {
        let id = gateway
            .create_stream(CreateStreamCommand {
                name: format!("stream-{}", Uuid::new_v4()),
                description: None,
                owner_id: Uuid::new_v4().to_string(),
                stream_type: "EVENT".into(),
            })
            .await
            .unwrap()
            .id
            .to_string();
        gateway
            .update_stream(UpdateStreamCommand {
                stream_id: id.clone(),
                status: Some("ACTIVE".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        id
    }

    fn inbound(
        cmds: Vec<Result<PublishEventCommand, GatewayError>>,
    ) -> impl Stream<Item = Result<PublishEventCommand, GatewayError>> + Send {
        stream::iter(cmds)
    }

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let mut handle = f.gateway.subscribe(&id).await.unwrap();

        let summary = f
            .gateway
            .publish_stream(inbound(vec![
                Ok(PublishEventCommand::new(id.clone(), &b"a"[..])),
                Ok(PublishEventCommand::new(id.clone(), &b"b"[..])),
            ]))
            .await
            .unwrap();
        assert_eq!(summary.events_accepted, 2);

        let first = tokio::time::timeout(WAIT, handle.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(WAIT, handle.recv()).await.unwrap().unwrap();
        assert_eq!(first.payload.as_bytes().as_ref(), b"a");
        assert_eq!(second.payload.as_bytes().as_ref(), b"b");
    }

    #[tokio::test]
    async fn client_stream_of_three_reports_three() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let mut handle = f.gateway.subscribe(&id).await.unwrap();

        let cmds = (0..3)
            .map(|_| Ok(PublishEventCommand::new(id.clone(), &b"x"[..])))
            .collect();
        let summary = f.gateway.publish_stream(inbound(cmds)).await.unwrap();

        assert_eq!(summary.events_accepted, 3);
        assert_eq!(summary.message, "Published 3 event(s) successfully");
        for _ in 0..3 {
            assert!(tokio::time::timeout(WAIT, handle.recv()).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn empty_client_stream_reports_zero() {
        let f = fixture();
        let summary = f.gateway.publish_stream(inbound(vec![])).await.unwrap();
        assert_eq!(summary.events_accepted, 0);
        assert_eq!(summary.message, "Published 0 event(s) successfully");
    }

    #[tokio::test]
    async fn client_stream_aborts_on_first_rejected_event() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let missing = Uuid::new_v4().to_string();

        let err = f
            .gateway
            .publish_stream(inbound(vec![
                Ok(PublishEventCommand::new(id.clone(), &b"1"[..])),
                Ok(PublishEventCommand::new(missing, &b"2"[..])),
                Ok(PublishEventCommand::new(id.clone(), &b"3"[..])),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Domain(DomainError::StreamNotFound(_))
        ));

        let stored = f.gateway.events().list_for_stream(&id, None, None).await.unwrap();
        assert_eq!(stored.total, 1);
    }

    #[tokio::test]
    async fn client_stream_aborts_on_inbound_error() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let err = f
            .gateway
            .publish_stream(inbound(vec![
                Ok(PublishEventCommand::new(id, &b"1"[..])),
                Err(GatewayError::ClientAborted("reset".into())),
            ]))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::ClientAborted("reset".into()));
    }

    #[tokio::test]
    async fn bidirectional_echoes_each_event_with_new_id() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let root = CancellationToken::new();
        let (observer, mut responses) = response_channel(8, &root);

        let echoed = f
            .gateway
            .stream_bidirectional(
                inbound(vec![
                    Ok(PublishEventCommand::new(id.clone(), &b"A"[..])),
                    Ok(PublishEventCommand::new(id.clone(), &b"B"[..])),
                ]),
                observer,
            )
            .await
            .unwrap();
        assert_eq!(echoed, 2);

        let a = responses.recv().await.unwrap();
        let b = responses.recv().await.unwrap();
        assert_eq!(a.payload.as_bytes().as_ref(), b"A");
        assert_eq!(b.payload.as_bytes().as_ref(), b"B");
        assert_ne!(a.event_id, b.event_id);
    }

    #[tokio::test]
    async fn bidirectional_stops_when_peer_is_gone() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let root = CancellationToken::new();
        let (observer, responses) = response_channel(8, &root);
        drop(responses);

        let err = f
            .gateway
            .stream_bidirectional(
                inbound(vec![Ok(PublishEventCommand::new(id, &b"A"[..]))]),
                observer,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CANCELLED");
    }

    #[tokio::test]
    async fn subscribe_to_missing_stream_registers_nothing() {
        let f = fixture();
        let err = f
            .gateway
            .subscribe(&Uuid::new_v4().to_string())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.gateway.broker().total_subscriptions(), 0);
    }

    #[tokio::test]
    async fn dropping_handle_deregisters() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let handle = f.gateway.subscribe(&id).await.unwrap();
        let stream_id = handle.subscription().stream_id();
        assert_eq!(f.gateway.broker().subscriber_count(stream_id), 1);

        drop(handle);
        tokio::time::timeout(WAIT, async {
            while f.gateway.broker().subscriber_count(stream_id) > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn close_reports_cancelled_exit() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let handle = f.gateway.subscribe(&id).await.unwrap();
        let exit = tokio::time::timeout(WAIT, handle.close()).await.unwrap();
        assert_eq!(exit, Some(DeliveryExit::Cancelled));
    }

    #[tokio::test]
    async fn shutdown_cancels_live_subscriptions() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let handle = f.gateway.subscribe(&id).await.unwrap();

        f.shutdown.cancel();
        tokio::time::timeout(WAIT, handle.cancelled()).await.unwrap();
        tokio::time::timeout(WAIT, async {
            while f.gateway.broker().total_subscriptions() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn update_applies_status_then_config() {
        let f = fixture();
        let id = f
            .gateway
            .create_stream(CreateStreamCommand {
                name: "before".into(),
                description: Some("old".into()),
                owner_id: Uuid::new_v4().to_string(),
                stream_type: "METRIC".into(),
            })
            .await
            .unwrap()
            .id
            .to_string();

        let updated = f
            .gateway
            .update_stream(UpdateStreamCommand {
                stream_id: id.clone(),
                name: Some("after".into()),
                description: None,
                status: Some("ACTIVE".into()),
            })
            .await
            .unwrap();
        assert_eq!(updated.status, StreamStatus::Active);
        assert_eq!(updated.name, "after");
        assert_eq!(updated.description, None);

        let err = f
            .gateway
            .update_stream(UpdateStreamCommand {
                stream_id: id,
                status: Some("DRAFT".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn delete_returns_confirmation() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let result = f.gateway.delete_stream(&id).await.unwrap();
        assert!(result.success);
        assert_eq!(
            f.gateway.get_stream(&id).await.unwrap().status,
            StreamStatus::Deleted
        );
    }

    #[tokio::test]
    async fn description_only_update_keeps_name() {
        let f = fixture();
        let id = active_stream(&f.gateway).await;
        let before = f.gateway.get_stream(&id).await.unwrap();

        let described = f
            .gateway
            .update_stream(UpdateStreamCommand {
                stream_id: id.clone(),
                description: Some("fresh".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(described.name, before.name);
        assert_eq!(described.description.as_deref(), Some("fresh"));
        assert_eq!(described.status, StreamStatus::Active);
    }
}
