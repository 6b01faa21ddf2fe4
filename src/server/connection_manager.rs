use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ServerMessage};

use super::RegisterClientError;

/// Transport side of one accepted WebSocket.
#[derive(Debug, Clone)]
pub(crate) struct ClientConnection {
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub client_addr: SocketAddr,
    pub connected_at: Instant,
    /// Cancelled to force-close the socket.
    pub shutdown: CancellationToken,
}

/// Outbound queues and per-IP accounting, keyed by connection id.
///
/// Independent of the registry lock: senders are looked up and fed with
/// `try_send`, so nothing here ever waits on a slow client.
pub(crate) struct ConnectionManager {
    clients: DashMap<ConnectionId, ClientConnection>,
    connections_per_ip: DashMap<IpAddr, usize>,
    metrics: Arc<ServerMetrics>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            metrics,
            max_connections_per_ip,
        }
    }

    pub fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
        shutdown: CancellationToken,
    ) -> Result<ConnectionId, RegisterClientError> {
        let ip = client_addr.ip();
        if let Err(current) = self.try_reserve_ip_slot(ip) {
            warn!(
                %ip,
                current,
                max = self.max_connections_per_ip,
                "IP connection limit exceeded"
            );
            self.metrics.increment_connection_limit_rejections();
            return Err(RegisterClientError::IpLimitExceeded {
                current,
                limit: self.max_connections_per_ip,
            });
        }

        let connection_id = Uuid::new_v4();
        self.clients.insert(
            connection_id,
            ClientConnection {
                sender,
                client_addr,
                connected_at: Instant::now(),
                shutdown,
            },
        );
        self.metrics.increment_connections();

        info!(%connection_id, %client_addr, "Client connected");
        Ok(connection_id)
    }

    /// Insert a transport under a caller-chosen id, bypassing the IP cap.
    pub fn connect_test_client(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
        shutdown: CancellationToken,
    ) {
        self.increment_ip_slot_unbounded(client_addr.ip());
        self.clients.insert(
            connection_id,
            ClientConnection {
                sender,
                client_addr,
                connected_at: Instant::now(),
                shutdown,
            },
        );
        self.metrics.increment_connections();
    }

    /// Queue `message` for `connection_id`.
    ///
    /// Returns false when the transport is gone or its queue is full; both
    /// cases drop the message without blocking.
    pub fn send(&self, connection_id: &ConnectionId, message: Arc<ServerMessage>) -> bool {
        let Some(sender) = self
            .clients
            .get(connection_id)
            .map(|client| client.sender.clone())
        else {
            debug!(%connection_id, "No transport for outbound message");
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.metrics.increment_websocket_messages_dropped();
                warn!(%connection_id, "Outbound queue full; dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%connection_id, "Outbound queue closed; dropping message");
                false
            }
        }
    }

    /// Signal the socket tasks of `connection_id` to close.
    pub fn force_close(&self, connection_id: &ConnectionId) -> bool {
        match self.clients.get(connection_id) {
            Some(client) => {
                client.shutdown.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_client(&self, connection_id: &ConnectionId) -> bool {
        self.clients.contains_key(connection_id)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn remove_client(&self, connection_id: &ConnectionId) -> Option<ClientConnection> {
        self.clients.remove(connection_id).map(|(_, connection)| {
            self.release_ip_slot(connection.client_addr.ip());
            debug!(
                %connection_id,
                connected_for_ms = connection.connected_at.elapsed().as_millis() as u64,
                "Transport removed"
            );
            connection
        })
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, usize> {
        match self.connections_per_ip.entry(ip) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(current)
                } else {
                    let count = entry.get_mut();
                    *count += 1;
                    Ok(*count)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(0)
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    fn increment_ip_slot_unbounded(&self, ip: IpAddr) {
        *self.connections_per_ip.entry(ip).or_insert(0) += 1;
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Some(mut entry) = self.connections_per_ip.get_mut(&ip) {
            if *entry > 1 {
                *entry -= 1;
                return;
            }
        }
        self.connections_per_ip.remove(&ip);
    }
}
