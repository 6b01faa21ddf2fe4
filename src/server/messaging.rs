use super::{ChatServer, SessionError};
use crate::protocol::{ConnectionId, ErrorCode, ServerMessage};
use std::sync::Arc;

impl ChatServer {
    /// Queue a message for one connection. Never blocks; returns false when
    /// the message was dropped.
    pub(crate) fn send_to(&self, connection_id: &ConnectionId, message: ServerMessage) -> bool {
        self.connection_manager.send(connection_id, Arc::new(message))
    }

    /// Send an `error` envelope with an explicit code.
    pub fn send_error_to_client(
        &self,
        connection_id: &ConnectionId,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> bool {
        self.send_to(connection_id, ServerMessage::error(code, message))
    }

    pub(crate) fn send_session_error(&self, connection_id: &ConnectionId, err: &SessionError) {
        if let SessionError::Internal(detail) = err {
            self.metrics.increment_internal_errors();
            tracing::error!(%connection_id, %detail, "Session operation aborted");
        } else {
            tracing::debug!(%connection_id, error = %err, "Session operation rejected");
        }
        self.send_error_to_client(connection_id, err.error_code(), err.user_message());
    }
}
