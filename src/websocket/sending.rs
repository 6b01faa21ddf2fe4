use crate::protocol::{ConnectionId, ServerMessage};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

const SERIALIZATION_FALLBACK: &str =
    r#"{"type":"error","message":"Internal server error","code":"INTERNAL_ERROR"}"#;

pub(super) fn encode_server_message(message: &ServerMessage) -> String {
    serde_json::to_string(message).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to serialize server message");
        SERIALIZATION_FALLBACK.to_string()
    })
}

/// Write one envelope as a text frame.
pub(super) async fn send_server_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    connection_id: Option<&ConnectionId>,
) -> Result<(), axum::Error> {
    let payload = encode_server_message(message);
    sender
        .send(Message::Text(payload.into()))
        .await
        .inspect_err(|err| {
            tracing::debug!(?connection_id, error = %err, "Failed to write frame; socket closed");
        })
}
