//! Bounded per-subscription event queue
//!
//! The sending half lives in the broker registry, the receiving half is
//! owned by exactly one delivery loop. When the queue is full the incoming
//! event is rejected, so already-queued events are never displaced or
//! reordered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::DataEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Create a queue holding at most `capacity` pending events.
///
/// A capacity of zero is raised to one.
pub fn subscriber_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer side. Deliberately not `Clone`: registering moves it into the
/// broker, so one queue can only ever sit under one stream key.
#[derive(Debug)]
pub struct QueueSender {
    tx: mpsc::Sender<Arc<DataEvent>>,
}

impl QueueSender {
    /// Non-blocking enqueue. Returns false if the queue is full or its
    /// receiver is gone.
    pub fn offer(&self, event: Arc<DataEvent>) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of a bounded wait on the queue
#[derive(Debug)]
pub enum Polled {
    Event(Arc<DataEvent>),
    /// Nothing arrived within the timeout
    Timeout,
    /// The sending half was dropped (subscription deregistered) and the
    /// queue is drained
    Closed,
}

#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::Receiver<Arc<DataEvent>>,
}

impl QueueReceiver {
    /// Wait up to `timeout` for the next event.
    pub async fn poll(&mut self, timeout: Duration) -> Polled {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => Polled::Event(event),
            Ok(None) => Polled::Closed,
            Err(_) => Polled::Timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
