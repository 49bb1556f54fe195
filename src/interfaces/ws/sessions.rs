//! WebSocket sessions for the three streaming gateway shapes
//!
//! - `GET /ws/streams/{id}/subscribe`: server streaming
//! - `GET /ws/publish`: client streaming
//! - `GET /ws/bidirectional`: publish with per-event echo

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::frames::{inbound_commands, send_frame, ServerFrame};
use crate::application::ports::ObserverClosed;
use crate::domain::DataEvent;
use crate::interfaces::gateway::{GatewayError, StreamGateway, SubscriptionHandle};
use crate::interfaces::http::common::ApiError;

#[derive(Clone)]
pub struct StreamingState {
    pub gateway: Arc<StreamGateway>,
}

type SocketSink = SplitSink<WebSocket, Message>;

async fn fail_and_close(sender: &mut SocketSink, err: &GatewayError) {
    send_frame(sender, &ServerFrame::error(err)).await;
    let _ = sender.close().await;
}

// ── Server streaming ───────────────────────────────────────────

/// The subscription is registered before the upgrade, so an unknown stream
/// is answered with a plain 404 and events published while the handshake
/// completes are already queued.
pub async fn ws_subscribe_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<StreamingState>,
    Path(stream_id): Path<String>,
) -> Result<Response, ApiError> {
    let handle = state.gateway.subscribe(&stream_id).await?;
    let ws = match upgrade {
        Ok(ws) => ws,
        // Dropping the handle cancels the subscription
        Err(rejection) => return Ok(rejection.into_response()),
    };
    Ok(ws.on_upgrade(move |socket| run_subscription(socket, handle)))
}

async fn run_subscription(socket: WebSocket, mut handle: SubscriptionHandle) {
    let (mut sender, mut receiver) = socket.split();
    let subscription = handle.subscription().clone();
    info!(
        stream_id = %subscription.stream_id(),
        subscription_id = %subscription.id(),
        "Subscriber connected"
    );

    let hello = ServerFrame::Subscribed {
        subscription_id: subscription.id().to_string(),
        stream_id: subscription.stream_id().to_string(),
    };
    if send_frame(&mut sender, &hello).await {
        loop {
            tokio::select! {
                event = handle.recv() => match event {
                    Some(event) => {
                        if !send_frame(&mut sender, &ServerFrame::event(&event)).await {
                            break;
                        }
                    }
                    // Delivery ended: cancelled by shutdown or deregistered
                    None => {
                        let _ = sender.close().await;
                        break;
                    }
                },
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => debug!("Ignoring inbound frame on subscribe socket"),
                },
            }
        }
    }

    let exit = handle.close().await;
    info!(
        stream_id = %subscription.stream_id(),
        subscription_id = %subscription.id(),
        exit = ?exit,
        "Subscriber disconnected"
    );
}

// ── Client streaming ───────────────────────────────────────────

pub async fn ws_publish_handler(
    ws: WebSocketUpgrade,
    State(state): State<StreamingState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_publish(socket, state.gateway))
}

async fn run_publish(socket: WebSocket, gateway: Arc<StreamGateway>) {
    let (mut sender, receiver) = socket.split();
    let shutdown = gateway.shutdown_token();

    let result = tokio::select! {
        result = gateway.publish_stream(inbound_commands(receiver)) => result,
        _ = shutdown.cancelled() => Err(GatewayError::Closed(ObserverClosed)),
    };

    match result {
        Ok(summary) => {
            send_frame(&mut sender, &ServerFrame::summary(summary)).await;
            let _ = sender.close().await;
        }
        Err(err) => fail_and_close(&mut sender, &err).await,
    }
}

// ── Bidirectional ──────────────────────────────────────────────

pub async fn ws_bidirectional_handler(
    ws: WebSocketUpgrade,
    State(state): State<StreamingState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_bidirectional(socket, state.gateway))
}

async fn run_bidirectional(socket: WebSocket, gateway: Arc<StreamGateway>) {
    let (mut sender, receiver) = socket.split();
    let (observer, mut responses) = gateway.open_responses::<Arc<DataEvent>>();
    let shutdown = gateway.shutdown_token();

    let result = {
        // Echoes are written concurrently with accepting inbound frames; the
        // response buffer is the only coupling between the two.
        let forward = async {
            while let Some(event) = responses.recv().await {
                if !send_frame(&mut sender, &ServerFrame::event(&event)).await {
                    warn!("Bidirectional peer stopped reading");
                    responses.cancel();
                    break;
                }
            }
        };
        let session = gateway.stream_bidirectional(inbound_commands(receiver), observer);

        tokio::select! {
            (result, ()) = async { tokio::join!(session, forward) } => result,
            _ = shutdown.cancelled() => Err(GatewayError::Closed(ObserverClosed)),
        }
    };

    match result {
        Ok(echoed) => {
            debug!(echoed, "Bidirectional session completed");
            let _ = sender.close().await;
        }
        Err(err) => fail_and_close(&mut sender, &err).await,
    }
}
