//! Random partner selection over the waiting pool.

use super::registry::{Registry, RegistryError};
use super::{ChatServer, SessionError};
use crate::protocol::{ConnectionId, ServerMessage};

/// Result of one matchmaking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(ConnectionId),
    Waiting,
    /// Candidate was not registered or already paired; nothing happened.
    Skipped,
}

impl ChatServer {
    /// Try to pair `candidate` with a uniformly random waiting connection,
    /// never one listed in `exclude`.
    ///
    /// Both sides are told `matched` on success; otherwise the candidate is
    /// told `waiting` and stays in the pool.
    pub async fn find_partner(
        &self,
        candidate: &ConnectionId,
        exclude: &[ConnectionId],
    ) -> Result<MatchOutcome, SessionError> {
        let mut registry = self.registry.lock().await;
        self.pair_locked(&mut registry, candidate, exclude)
            .map_err(SessionError::from)
    }

    /// Selection and pairing in one step. Callers hold the registry lock,
    /// so no other task can pick the same partner in between.
    pub(super) fn pair_locked(
        &self,
        registry: &mut Registry,
        candidate: &ConnectionId,
        exclude: &[ConnectionId],
    ) -> Result<MatchOutcome, RegistryError> {
        let Some(connection) = registry.lookup(candidate) else {
            return Ok(MatchOutcome::Skipped);
        };
        if connection.partner.is_some() {
            return Ok(MatchOutcome::Skipped);
        }
        let candidate_name = connection.display_name.clone();

        let pool: Vec<(ConnectionId, String)> = registry
            .waiting(exclude)
            .filter(|conn| conn.id != *candidate)
            .map(|conn| (conn.id, conn.display_name.clone()))
            .collect();

        if pool.is_empty() {
            tracing::debug!(connection_id = %candidate, "No partner available; waiting");
            self.metrics.increment_waiting_replies();
            self.send_to(candidate, ServerMessage::Waiting);
            return Ok(MatchOutcome::Waiting);
        }

        let (partner_id, partner_name) = &pool[fastrand::usize(..pool.len())];

        if let Err(err) = registry.set_partner(*candidate, *partner_id) {
            tracing::error!(
                connection_id = %candidate,
                %partner_id,
                error = %err,
                "Refusing to pair connections"
            );
            return Err(err);
        }

        tracing::info!(
            connection_id = %candidate,
            %partner_id,
            pool_size = pool.len(),
            "Connections matched"
        );
        self.metrics.increment_matches();
        self.send_to(
            candidate,
            ServerMessage::Matched {
                partner_name: partner_name.clone(),
            },
        );
        self.send_to(
            partner_id,
            ServerMessage::Matched {
                partner_name: candidate_name,
            },
        );
        Ok(MatchOutcome::Matched(*partner_id))
    }
}
