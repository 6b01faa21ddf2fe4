use crate::protocol::{ConnectionId, ErrorCode, ServerMessage};
use crate::server::{ChatServer, RegisterClientError};
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::sending::send_server_message;

pub(super) async fn handle_socket(socket: WebSocket, server: Arc<ChatServer>, addr: SocketAddr) {
    let (mut sender, receiver) = socket.split();
    let queue_capacity = server.config().outbound_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<Arc<ServerMessage>>(queue_capacity);
    let shutdown = CancellationToken::new();

    let connection_id = match server.register_client(tx, addr, shutdown.clone()) {
        Ok(connection_id) => connection_id,
        Err(err @ RegisterClientError::IpLimitExceeded { .. }) => {
            let error_message = ServerMessage::error(ErrorCode::TooManyConnections, err.to_string());
            let _ = send_server_message(&mut sender, &error_message, None).await;
            let _ = sender.close().await;
            return;
        }
    };

    // Drains the outbound queue until every sender is gone (normal close,
    // after flushing) or the connection is force-closed.
    let send_shutdown = shutdown.clone();
    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = send_shutdown.cancelled() => break,
                message = rx.recv() => {
                    let Some(message) = message else { break };
                    if send_server_message(&mut sender, &message, Some(&connection_id))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    let receive_task = tokio::spawn(receive_loop(
        receiver,
        server.clone(),
        connection_id,
        shutdown.clone(),
    ));

    tokio::select! {
        _ = send_task => {
            tracing::debug!(%connection_id, "Send task completed");
            // Writer is gone; stop reading too.
            shutdown.cancel();
        }
        _ = receive_task => {
            tracing::debug!(%connection_id, "Receive task completed");
        }
    }

    server.disconnect(&connection_id).await;
}

/// Handle inbound frames strictly in arrival order.
async fn receive_loop(
    mut receiver: SplitStream<WebSocket>,
    server: Arc<ChatServer>,
    connection_id: ConnectionId,
    shutdown: CancellationToken,
) {
    let join_timeout = server.config().join_timeout;
    let join_deadline = tokio::time::sleep_until(Instant::now() + join_timeout);
    tokio::pin!(join_deadline);
    let mut joined = false;

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => {
                tracing::debug!(%connection_id, "Connection force-closed");
                break;
            }
            () = &mut join_deadline, if !joined => {
                tracing::info!(
                    %connection_id,
                    timeout_secs = join_timeout.as_secs(),
                    "Join timeout, closing connection"
                );
                server.metrics().increment_join_timeouts();
                server.send_error_to_client(
                    &connection_id,
                    ErrorCode::JoinTimeout,
                    format!("Join within {} seconds of connecting", join_timeout.as_secs()),
                );
                break;
            }
            frame = receiver.next() => match frame {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => {
                    tracing::debug!(%connection_id, error = %err, "WebSocket error");
                    break;
                }
                None => break,
            },
        };

        match frame {
            Message::Text(text) => {
                let text = text.as_str();
                let max_size = server.config().max_message_size;
                if text.len() > max_size {
                    tracing::warn!(
                        %connection_id,
                        size = text.len(),
                        max = max_size,
                        "Message exceeds size limit"
                    );
                    server.metrics().increment_oversized_frames();
                    server.send_error_to_client(
                        &connection_id,
                        ErrorCode::MessageTooLarge,
                        format!(
                            "Message too large ({} bytes, max {max_size} bytes)",
                            text.len()
                        ),
                    );
                    continue;
                }

                server.handle_text_frame(&connection_id, text).await;
                if !joined {
                    joined = server.is_joined(&connection_id).await;
                }
            }
            Message::Binary(_) => {
                server.metrics().increment_malformed_envelopes();
                server.send_error_to_client(
                    &connection_id,
                    ErrorCode::MalformedEnvelope,
                    "Binary frames are not supported",
                );
            }
            Message::Ping(_) | Message::Pong(_) => {
                server.mark_alive(&connection_id).await;
            }
            Message::Close(_) => {
                tracing::debug!(%connection_id, "Client sent close frame");
                break;
            }
        }
    }
}
