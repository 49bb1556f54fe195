//! Channel-backed [`ResponseObserver`]
//!
//! The session side pushes into a bounded mpsc channel; the transport side
//! holds the matching [`ResponseStream`] and forwards items to the peer.
//! Cancellation is a [`CancellationToken`] derived from the server's
//! shutdown token, and dropping the `ResponseStream` cancels it, so a
//! disconnected peer is noticed by the session without any extra wiring.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::application::ports::{ObserverClosed, ResponseObserver};

/// Create a linked observer / response stream pair.
///
/// `parent` is typically the shutdown token: cancelling it cancels this
/// session too, while cancelling the session leaves the parent untouched.
pub fn response_channel<T>(
    capacity: usize,
    parent: &CancellationToken,
) -> (Arc<ChannelObserver<T>>, ResponseStream<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let token = parent.child_token();
    let observer = Arc::new(ChannelObserver {
        tx,
        token: token.clone(),
    });
    let stream = ResponseStream {
        rx,
        _guard: token.clone().drop_guard(),
        token,
    };
    (observer, stream)
}

pub struct ChannelObserver<T> {
    tx: mpsc::Sender<T>,
    token: CancellationToken,
}

impl<T> ChannelObserver<T> {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[async_trait]
impl<T: Send + 'static> ResponseObserver<T> for ChannelObserver<T> {
    async fn send(&self, item: T) -> Result<(), ObserverClosed> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ObserverClosed),
            sent = self.tx.send(item) => sent.map_err(|_| ObserverClosed),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.tx.is_closed()
    }

    fn on_cancel(&self, callback: Box<dyn FnOnce() + Send + 'static>) {
        let token = self.token.clone();
        tokio::spawn(async move {
            token.cancelled().await;
            callback();
        });
    }
}

/// Transport-facing end of a session. Dropping it cancels the session.
pub struct ResponseStream<T> {
    rx: mpsc::Receiver<T>,
    token: CancellationToken,
    _guard: DropGuard,
}

impl<T> ResponseStream<T> {
    /// Next item, or `None` once the session has ended and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the session is cancelled from either side or by shutdown.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
