use super::ChatServer;
use crate::protocol::{ConnectionId, ServerMessage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What one liveness sweep did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LivenessSweep {
    /// Connections that answered since the last sweep and were probed again
    pub probed: Vec<ConnectionId>,
    /// Connections that never answered the previous probe
    pub evicted: Vec<ConnectionId>,
}

impl ChatServer {
    /// Record that `connection_id` answered a probe (or sent its own heartbeat).
    pub async fn mark_alive(&self, connection_id: &ConnectionId) {
        if let Some(connection) = self.registry.lock().await.lookup_mut(connection_id) {
            connection.alive = true;
        }
    }

    /// Handle a client heartbeat: counts as a probe answer and gets a `pong`.
    pub async fn handle_ping(&self, connection_id: &ConnectionId) {
        self.mark_alive(connection_id).await;
        self.send_to(connection_id, ServerMessage::Pong);
    }

    /// Evict connections that ignored the previous probe, then probe the rest.
    ///
    /// A connection that stops answering is therefore gone within two
    /// sweeps.
    pub async fn run_liveness_sweep(&self) -> LivenessSweep {
        let mut sweep = LivenessSweep::default();
        {
            let mut registry = self.registry.lock().await;
            for connection in registry.iter_mut() {
                if connection.alive {
                    connection.alive = false;
                    sweep.probed.push(connection.id);
                } else {
                    sweep.evicted.push(connection.id);
                }
            }
        }

        for connection_id in &sweep.probed {
            self.send_to(connection_id, ServerMessage::Ping);
        }

        for connection_id in &sweep.evicted {
            tracing::info!(%connection_id, "Evicting unresponsive connection");
            self.connection_manager.force_close(connection_id);
            self.disconnect(connection_id).await;
        }

        self.metrics
            .record_liveness_sweep(sweep.probed.len(), sweep.evicted.len());
        if !sweep.evicted.is_empty() {
            tracing::info!(
                probed = sweep.probed.len(),
                evicted = sweep.evicted.len(),
                "Liveness sweep evicted connections"
            );
        }
        sweep
    }

    /// Run [`Self::run_liveness_sweep`] every `liveness_interval` until
    /// `shutdown` is cancelled.
    pub async fn liveness_task(self: Arc<Self>, shutdown: CancellationToken) {
        let period = self.config.liveness_interval;
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Liveness monitor stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.run_liveness_sweep().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::{ServerMessage, SessionState};
    use crate::server::{ChatServer, ServerConfig};
    use crate::config::ProtocolConfig;
    use crate::verification::AcceptAllVerifier;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    async fn joined(
        server: &ChatServer,
        name: &str,
    ) -> (
        Uuid,
        mpsc::Receiver<Arc<ServerMessage>>,
        CancellationToken,
    ) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(32);
        let shutdown = server.connect_client(id, tx);
        server.join(&id, name, None).await.expect("join succeeds");
        (id, rx, shutdown)
    }

    fn drain(rx: &mut mpsc::Receiver<Arc<ServerMessage>>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push((*message).clone());
        }
        out
    }

    #[tokio::test]
    async fn responsive_connections_survive_sweeps() {
        let server = ChatServer::with_defaults();
        let (id, mut rx, shutdown) = joined(&server, "Ada").await;
        drain(&mut rx);

        for _ in 0..3 {
            let sweep = server.run_liveness_sweep().await;
            assert_eq!(sweep.probed, vec![id]);
            assert!(sweep.evicted.is_empty());
            assert_eq!(drain(&mut rx), vec![ServerMessage::Ping]);
            server.mark_alive(&id).await;
        }

        assert!(!shutdown.is_cancelled());
        assert_eq!(server.session_state(&id).await, SessionState::Unpaired);
    }

    #[tokio::test]
    async fn silent_connection_is_evicted_on_second_sweep_and_partner_requeued() {
        let server = ChatServer::with_defaults();
        let (a, mut rx_a, shutdown_a) = joined(&server, "Ada").await;
        let (b, mut rx_b, _shutdown_b) = joined(&server, "Grace").await;
        assert_eq!(server.partner_of(&a).await, Some(b));
        drain(&mut rx_a);
        drain(&mut rx_b);

        let first = server.run_liveness_sweep().await;
        assert_eq!(first.probed.len(), 2);
        assert!(first.evicted.is_empty());

        // Only B answers.
        server.handle_ping(&b).await;
        drain(&mut rx_b);

        let second = server.run_liveness_sweep().await;
        assert_eq!(second.evicted, vec![a]);
        assert_eq!(second.probed, vec![b]);
        assert!(shutdown_a.is_cancelled());
        assert_eq!(server.session_state(&a).await, SessionState::Disconnected);
        assert_eq!(server.session_state(&b).await, SessionState::Unpaired);

        let to_b = drain(&mut rx_b);
        assert!(to_b.contains(&ServerMessage::PartnerDisconnected));
        assert!(to_b.contains(&ServerMessage::Waiting));
        server.check_pairing_invariants().await.unwrap();

        let snapshot = server.metrics().snapshot();
        assert_eq!(snapshot.liveness.evictions, 1);
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let server = ChatServer::with_defaults();
        let (id, mut rx, _shutdown) = joined(&server, "Ada").await;
        drain(&mut rx);

        server.handle_ping(&id).await;
        assert_eq!(drain(&mut rx), vec![ServerMessage::Pong]);
    }

    #[tokio::test(start_paused = true)]
    async fn liveness_task_stops_on_shutdown() {
        let server = ChatServer::new(
            ServerConfig {
                liveness_interval: Duration::from_secs(5),
                ..ServerConfig::default()
            },
            ProtocolConfig::default(),
            Arc::new(AcceptAllVerifier),
        );
        let (id, mut rx, _shutdown) = joined(&server, "Ada").await;
        drain(&mut rx);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(server.clone().liveness_task(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await.as_deref(), Some(&ServerMessage::Ping));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(server.session_state(&id).await, SessionState::Disconnected);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task exits promptly")
            .expect("task does not panic");
    }
}
