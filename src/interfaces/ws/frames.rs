//! JSON text frames exchanged on the streaming WebSocket endpoints
//!
//! Client → server:
//! `{"type":"publish","stream_id":"…","payload":"<base64>","metadata":{…}}`
//! and `{"type":"complete"}`.
//!
//! Server → client: `subscribed`, `event`, `summary` and `error` frames.

use std::collections::HashMap;

use axum::extract::ws::Message;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::{stream, Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::dto::{PublishEventCommand, PublishSummary};
use crate::domain::DataEvent;
use crate::interfaces::gateway::GatewayError;
use crate::interfaces::http::modules::streams::DataEventDto;
use crate::shared::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Publish {
        stream_id: String,
        payload: String,
        #[serde(default)]
        metadata: HashMap<String, String>,
    },
    Complete,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(text)
            .map_err(|e| DomainError::validation(format!("Malformed frame: {e}")).into())
    }
}

fn publish_command(
    stream_id: String,
    payload: &str,
    metadata: HashMap<String, String>,
) -> Result<PublishEventCommand, GatewayError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|_| DomainError::validation("Payload is not valid base64"))?;
    Ok(PublishEventCommand {
        stream_id,
        payload: bytes.into(),
        metadata,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Subscribed {
        subscription_id: String,
        stream_id: String,
    },
    Event(DataEventDto),
    Summary {
        events_accepted: u64,
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerFrame {
    pub fn event(event: &DataEvent) -> Self {
        Self::Event(DataEventDto::from(event))
    }

    pub fn summary(summary: PublishSummary) -> Self {
        Self::Summary {
            events_accepted: summary.events_accepted,
            message: summary.message,
        }
    }

    pub fn error(err: &GatewayError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Serialize and send one frame. `false` once the peer is gone.
pub async fn send_frame<S>(sink: &mut S, frame: &ServerFrame) -> bool
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize frame");
            return false;
        }
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}

/// Turn raw socket messages into publish commands.
///
/// The stream ends cleanly on a `complete` frame. A malformed frame, a
/// binary message, a transport error or the socket closing before
/// `complete` yields one error and then ends. Ping/pong are skipped.
pub fn inbound_commands<R, E>(
    receiver: R,
) -> impl Stream<Item = Result<PublishEventCommand, GatewayError>> + Send
where
    R: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: std::fmt::Display + Send,
{
    stream::unfold(Some(receiver), |state| async move {
        let mut receiver = state?;
        loop {
            let item = match receiver.next().await {
                Some(Ok(Message::Text(text))) => match ClientFrame::parse(text.as_str()) {
                    Ok(ClientFrame::Publish {
                        stream_id,
                        payload,
                        metadata,
                    }) => publish_command(stream_id, &payload, metadata),
                    Ok(ClientFrame::Complete) => return None,
                    Err(e) => Err(e),
                },
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => Err(DomainError::validation(
                    "Binary frames are not supported",
                )
                .into()),
                Some(Ok(Message::Close(_))) | None => Err(GatewayError::ClientAborted(
                    "connection closed before complete".to_string(),
                )),
                Some(Err(e)) => Err(GatewayError::ClientAborted(e.to_string())),
            };
            return match item {
                Ok(cmd) => Some((Ok(cmd), Some(receiver))),
                Err(e) => Some((Err(e), None)),
            };
        }
    })
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::domain::{EventPayload, StreamId};

    fn text(s: &str) -> Result<Message, Infallible> {
        Ok(Message::Text(s.to_string().into()))
    }

    #[test]
    fn parses_publish_and_complete() {
        let frame = ClientFrame::parse(
            r#"{"type":"publish","stream_id":"s","payload":"AQI=","metadata":{"k":"v"}}"#,
        )
        .unwrap();
        match frame {
            ClientFrame::Publish {
                stream_id,
                payload,
                metadata,
            } => {
                assert_eq!(stream_id, "s");
                assert_eq!(payload, "AQI=");
                assert_eq!(metadata["k"], "v");
            }
            other => panic!("unexpected frame {other:?}"),
        }
        assert_eq!(
            ClientFrame::parse(r#"{"type":"complete"}"#).unwrap(),
            ClientFrame::Complete
        );
    }

    #[test]
    fn unknown_frame_type_is_invalid_argument() {
        let err = ClientFrame::parse(r#"{"type":"subscribe"}"#).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENT");
    }

    #[test]
    fn server_frames_carry_type_tag() {
        let event = DataEvent::new(
            StreamId::generate(),
            EventPayload::new(&b"\x01\x02"[..]).unwrap(),
            HashMap::new(),
        );
        let json = serde_json::to_value(ServerFrame::event(&event)).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["payload"], "AQI=");
        assert_eq!(json["event_id"], event.event_id.to_string());

        let json = serde_json::to_value(ServerFrame::summary(PublishSummary::new(2))).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["events_accepted"], 2);
        assert_eq!(json["message"], "Published 2 event(s) successfully");

        let err = GatewayError::ClientAborted("gone".into());
        let json = serde_json::to_value(ServerFrame::error(&err)).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "CLIENT_ABORTED");
    }

    #[tokio::test]
    async fn inbound_ends_cleanly_on_complete() {
        let messages = stream::iter(vec![
            text(r#"{"type":"publish","stream_id":"a","payload":"aGk="}"#),
            Ok(Message::Ping(Vec::new().into())),
            text(r#"{"type":"publish","stream_id":"b","payload":""}"#),
            text(r#"{"type":"complete"}"#),
            text(r#"{"type":"publish","stream_id":"ignored","payload":""}"#),
        ]);
        let commands: Vec<_> = inbound_commands(messages).collect().await;

        assert_eq!(commands.len(), 2);
        let first = commands[0].as_ref().unwrap();
        assert_eq!(first.stream_id, "a");
        assert_eq!(&first.payload[..], b"hi");
        assert!(commands[1].as_ref().unwrap().payload.is_empty());
    }

    #[tokio::test]
    async fn close_without_complete_is_an_abort() {
        let messages = stream::iter(vec![
            text(r#"{"type":"publish","stream_id":"a","payload":""}"#),
            Ok(Message::Close(None)),
        ]);
        let commands: Vec<_> = inbound_commands(messages).collect().await;

        assert_eq!(commands.len(), 2);
        assert!(commands[0].is_ok());
        assert!(matches!(
            commands[1],
            Err(GatewayError::ClientAborted(_))
        ));
    }

    #[tokio::test]
    async fn bad_base64_stops_the_stream() {
        let messages = stream::iter(vec![
            text(r#"{"type":"publish","stream_id":"a","payload":"***"}"#),
            text(r#"{"type":"complete"}"#),
        ]);
        let commands: Vec<_> = inbound_commands(messages).collect().await;

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].as_ref().unwrap_err().code(), "INVALID_ARGUMENT");
    }
}
