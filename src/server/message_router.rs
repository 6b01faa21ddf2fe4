use crate::protocol::{ClientMessage, ConnectionId, EnvelopeError, ErrorCode};

use super::ChatServer;

impl ChatServer {
    /// Parse and dispatch one inbound text frame.
    pub async fn handle_text_frame(&self, connection_id: &ConnectionId, raw: &str) {
        match ClientMessage::parse(raw) {
            Ok(message) => self.handle_client_message(connection_id, message).await,
            Err(err) => self.reject_envelope(connection_id, &err),
        }
    }

    /// Dispatch a parsed client message. Failures are reported to the
    /// client as `error` envelopes and never close the connection.
    pub async fn handle_client_message(&self, connection_id: &ConnectionId, message: ClientMessage) {
        let kind = message.kind();
        tracing::trace!(%connection_id, kind, "Handling client message");

        let message = match message.into_relay() {
            Ok(envelope) => {
                if let Err(err) = self.relay(connection_id, envelope).await {
                    self.send_session_error(connection_id, &err);
                }
                return;
            }
            Err(control) => control,
        };

        let result = match message {
            ClientMessage::Join {
                display_name,
                verification_token,
            } => self
                .join(connection_id, &display_name, verification_token.as_deref())
                .await
                .map(|_| ()),
            ClientMessage::Skip => self.skip(connection_id).await.map(|_| ()),
            ClientMessage::Ping => {
                self.handle_ping(connection_id).await;
                Ok(())
            }
            ClientMessage::Pong => {
                self.mark_alive(connection_id).await;
                Ok(())
            }
            ClientMessage::Content { .. }
            | ClientMessage::Typing
            | ClientMessage::VideoOffer { .. }
            | ClientMessage::VideoAnswer { .. }
            | ClientMessage::Candidate { .. } => Ok(()),
        };

        if let Err(err) = result {
            self.send_session_error(connection_id, &err);
        }
    }

    pub(crate) fn reject_envelope(&self, connection_id: &ConnectionId, err: &EnvelopeError) {
        match err.error_code() {
            ErrorCode::UnknownMessageType => self.metrics.increment_unknown_envelopes(),
            _ => self.metrics.increment_malformed_envelopes(),
        }
        tracing::debug!(%connection_id, error = %err, "Rejected inbound envelope");
        self.send_error_to_client(connection_id, err.error_code(), err.user_message());
    }
}
