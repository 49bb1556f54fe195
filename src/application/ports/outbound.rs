//! Outbound ports: where accepted events and streamed responses leave the
//! application layer.
//!
//! [`EventPublisher`] is implemented by the in-process
//! [`EventBroker`](crate::application::streaming::EventBroker).
//! [`ResponseObserver`] is implemented by every transport session that
//! pushes items to a remote peer.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::DataEvent;

// ── Event publishing ───────────────────────────────────────────

/// Result of one fanout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Queues that accepted the event
    pub delivered: usize,
    /// Queues that were full (or already closed) and rejected it
    pub dropped: usize,
}

/// Hands accepted events to live subscribers. Must not block.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &Arc<DataEvent>) -> FanoutReport;
}

// ── Response streaming ─────────────────────────────────────────

/// The peer is gone or has cancelled; no further items can be sent.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("response stream closed")]
pub struct ObserverClosed;

/// Sink for the responses of one streaming session.
#[async_trait]
pub trait ResponseObserver<T: Send + 'static>: Send + Sync {
    /// Push one item to the peer.
    async fn send(&self, item: T) -> Result<(), ObserverClosed>;

    /// True once the peer has cancelled or disconnected.
    fn is_cancelled(&self) -> bool;

    /// Run `callback` exactly once when the session is cancelled. If it is
    /// already cancelled the callback runs promptly.
    fn on_cancel(&self, callback: Box<dyn FnOnce() + Send + 'static>);
}
