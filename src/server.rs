use crate::config::{Config, ProtocolConfig};
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ErrorCode, ServerMessage, SessionState};
use crate::verification::{AcceptAllVerifier, TokenVerifier};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

mod connection_manager;
mod lifecycle;
mod liveness;
mod matchmaker;
mod message_router;
mod messaging;
pub mod registry;
mod relay;

use connection_manager::ConnectionManager;
pub use liveness::LivenessSweep;
pub use matchmaker::MatchOutcome;
use registry::Registry;
pub use registry::RegistryError;

/// Anonymous 1:1 chat server: registry, matchmaker, relay and liveness
/// monitor behind one shared handle.
pub struct ChatServer {
    /// Identity and pairing state. The only lock that guards pairing.
    registry: Mutex<Registry>,
    /// Outbound queues and per-IP accounting
    connection_manager: ConnectionManager,
    /// Server configuration
    config: ServerConfig,
    /// Protocol configuration for validation
    protocol_config: ProtocolConfig,
    /// Human-verification collaborator consulted on join
    verifier: Arc<dyn TokenVerifier>,
    /// Server metrics
    pub(crate) metrics: Arc<ServerMetrics>,
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// Failures of a client-initiated session operation.
///
/// Every variant is reported to the client as an `error` envelope; none of
/// them closes the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid display name: {0}")]
    InvalidIdentity(String),
    #[error("connection already joined")]
    DuplicateRegistration,
    #[error("connection has no partner")]
    NoPartner,
    #[error("connection has not joined")]
    NotJoined,
    #[error("human verification failed")]
    VerificationFailed,
    #[error("internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidIdentity(_) => ErrorCode::InvalidIdentity,
            Self::DuplicateRegistration => ErrorCode::DuplicateRegistration,
            Self::NoPartner => ErrorCode::NoPartner,
            Self::NotJoined => ErrorCode::NotJoined,
            Self::VerificationFailed => ErrorCode::VerificationFailed,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Text sent to the client. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidIdentity(reason) => reason.clone(),
            Self::DuplicateRegistration => "You have already joined".to_string(),
            Self::NoPartner => "You are not connected to a partner".to_string(),
            Self::NotJoined => "Join with a display name first".to_string(),
            Self::VerificationFailed => "Human verification failed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<RegistryError> for SessionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidIdentity => {
                Self::InvalidIdentity("Display name cannot be empty".to_string())
            }
            RegistryError::DuplicateRegistration(_) => Self::DuplicateRegistration,
            RegistryError::NotRegistered(_) => Self::NotJoined,
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Period of the liveness sweep
    pub liveness_interval: Duration,
    /// How long a socket may stay open without joining
    pub join_timeout: Duration,
    pub outbound_queue_capacity: usize,
    pub max_message_size: usize,
    pub max_connections_per_ip: usize,
    pub require_metrics_auth: bool,
    pub metrics_auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            liveness_interval: Duration::from_secs(30),
            join_timeout: Duration::from_secs(60),
            outbound_queue_capacity: 64,
            max_message_size: 8 * 1024 * 1024,
            max_connections_per_ip: 16,
            require_metrics_auth: false,
            metrics_auth_token: None,
        }
    }
}

impl ServerConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            liveness_interval: Duration::from_secs(cfg.server.liveness_interval_secs),
            join_timeout: Duration::from_secs(cfg.websocket.join_timeout_secs),
            outbound_queue_capacity: cfg.server.outbound_queue_capacity,
            max_message_size: cfg.security.max_message_size,
            max_connections_per_ip: cfg.security.max_connections_per_ip,
            require_metrics_auth: cfg.security.require_metrics_auth,
            metrics_auth_token: cfg.security.metrics_auth_token.clone(),
        }
    }
}

impl ChatServer {
    pub fn new(
        config: ServerConfig,
        protocol_config: ProtocolConfig,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let connection_manager =
            ConnectionManager::new(config.max_connections_per_ip, metrics.clone());

        Arc::new(Self {
            registry: Mutex::new(Registry::new()),
            connection_manager,
            config,
            protocol_config,
            verifier,
            metrics,
        })
    }

    /// Server with default settings that admits every join.
    pub fn with_defaults() -> Arc<Self> {
        Self::new(
            ServerConfig::default(),
            ProtocolConfig::default(),
            Arc::new(AcceptAllVerifier),
        )
    }

    /// Register a freshly accepted transport. The connection starts in
    /// [`SessionState::Connecting`] until it joins.
    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<ConnectionId, RegisterClientError> {
        self.connection_manager
            .register_client(sender, client_addr, shutdown)
    }

    /// Attach a transport under a known id (used for testing).
    ///
    /// Returns the token that the liveness monitor cancels on eviction.
    pub fn connect_client(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
    ) -> CancellationToken {
        let shutdown = CancellationToken::new();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        self.connection_manager
            .connect_test_client(connection_id, sender, addr, shutdown.clone());
        tracing::debug!(%connection_id, "Test client connected");
        shutdown
    }

    /// Current lifecycle state of `connection_id`.
    pub async fn session_state(&self, connection_id: &ConnectionId) -> SessionState {
        let registry = self.registry.lock().await;
        match registry.lookup(connection_id) {
            Some(connection) => connection.state(),
            None if self.connection_manager.has_client(connection_id) => SessionState::Connecting,
            None => SessionState::Disconnected,
        }
    }

    /// Whether `connection_id` has completed `join`.
    pub async fn is_joined(&self, connection_id: &ConnectionId) -> bool {
        self.registry.lock().await.contains(connection_id)
    }

    pub async fn partner_of(&self, connection_id: &ConnectionId) -> Option<ConnectionId> {
        self.registry
            .lock()
            .await
            .lookup(connection_id)
            .and_then(|connection| connection.state().partner())
    }

    pub async fn display_name(&self, connection_id: &ConnectionId) -> Option<String> {
        self.registry
            .lock()
            .await
            .lookup(connection_id)
            .map(|connection| connection.display_name.clone())
    }

    /// Number of joined connections.
    pub async fn registered_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Number of joined connections without a partner.
    pub async fn waiting_count(&self) -> usize {
        self.registry.lock().await.waiting_count()
    }

    /// Number of joined connections that currently have a partner.
    pub async fn paired_count(&self) -> usize {
        self.registry.lock().await.paired_count()
    }

    /// Number of open transports, joined or not.
    pub fn transport_count(&self) -> usize {
        self.connection_manager.client_count()
    }

    /// Verify that pairing is symmetric across the whole registry.
    pub async fn check_pairing_invariants(&self) -> Result<(), String> {
        self.registry.lock().await.verify_invariants()
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn protocol_config(&self) -> &ProtocolConfig {
        &self.protocol_config
    }

    /// Get server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_map_to_wire_codes() {
        assert_eq!(
            SessionError::InvalidIdentity("x".into()).error_code(),
            ErrorCode::InvalidIdentity
        );
        assert_eq!(SessionError::NoPartner.error_code(), ErrorCode::NoPartner);
        assert_eq!(
            SessionError::Internal("boom".into()).user_message(),
            "Internal server error"
        );
    }

    #[test]
    fn invariant_violations_become_internal_errors() {
        let id = uuid::Uuid::new_v4();
        assert!(matches!(
            SessionError::from(RegistryError::AlreadyPaired(id)),
            SessionError::Internal(_)
        ));
        assert_eq!(
            SessionError::from(RegistryError::DuplicateRegistration(id)),
            SessionError::DuplicateRegistration
        );
    }

    #[test]
    fn runtime_config_follows_loaded_config() {
        let mut cfg = Config::default();
        cfg.server.liveness_interval_secs = 7;
        cfg.websocket.join_timeout_secs = 20;
        cfg.security.max_connections_per_ip = 3;

        let server_config = ServerConfig::from_config(&cfg);
        assert_eq!(server_config.liveness_interval, Duration::from_secs(7));
        assert_eq!(server_config.join_timeout, Duration::from_secs(20));
        assert_eq!(server_config.max_connections_per_ip, 3);
    }

    #[tokio::test]
    async fn session_state_tracks_transport_before_join() {
        let server = ChatServer::with_defaults();
        let id = uuid::Uuid::new_v4();
        assert_eq!(server.session_state(&id).await, SessionState::Disconnected);

        let (tx, _rx) = mpsc::channel(8);
        let _shutdown = server.connect_client(id, tx);
        assert_eq!(server.session_state(&id).await, SessionState::Connecting);
    }
}
