//! Session transitions: join, skip and disconnect.
//!
//! ```text
//! Connecting --join--> Unpaired <--matched/skip--> Paired
//!      \                  |                          |
//!       +------------- close / eviction -------------+--> Disconnected
//! ```

use super::matchmaker::MatchOutcome;
use super::{ChatServer, SessionError};
use crate::protocol::validation::validate_display_name_with_config;
use crate::protocol::{ConnectionId, ServerMessage};

impl ChatServer {
    /// Establish identity for `connection_id` and enter the waiting pool.
    ///
    /// The verifier is awaited without holding the registry lock, so a slow
    /// verification endpoint never stalls other connections.
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        display_name: &str,
        verification_token: Option<&str>,
    ) -> Result<MatchOutcome, SessionError> {
        if self.registry.lock().await.contains(connection_id) {
            self.metrics.increment_join_rejections();
            return Err(SessionError::DuplicateRegistration);
        }

        let display_name = validate_display_name_with_config(display_name, &self.protocol_config)
            .map_err(|reason| {
                self.metrics.increment_join_rejections();
                SessionError::InvalidIdentity(reason)
            })?;

        match self.verifier.verify(verification_token).await {
            Ok(true) => {}
            Ok(false) => {
                self.metrics.increment_verification_failures();
                tracing::info!(%connection_id, "Join rejected by human verification");
                return Err(SessionError::VerificationFailed);
            }
            Err(err) => {
                self.metrics.increment_verification_failures();
                tracing::warn!(%connection_id, error = %err, "Human verification unavailable");
                return Err(SessionError::VerificationFailed);
            }
        }

        let mut registry = self.registry.lock().await;
        if !self.connection_manager.has_client(connection_id) {
            // Transport closed while the verdict was pending.
            tracing::debug!(%connection_id, "Transport gone before join completed");
            return Ok(MatchOutcome::Skipped);
        }
        registry.register(*connection_id, &display_name)?;
        self.metrics.increment_joins();
        tracing::info!(%connection_id, %display_name, "Connection joined");

        Ok(self.pair_locked(&mut registry, connection_id, &[])?)
    }

    /// Leave the current partner and look for a new one.
    ///
    /// When paired, the pairing is cleared and both sides are requeued in
    /// one critical section, each excluding the other. When unpaired, this is
    /// a plain rematch attempt.
    ///
    /// With no third connection waiting, both sides stay in the pool and
    /// are only matched again with a newcomer, never with each other.
    pub async fn skip(&self, connection_id: &ConnectionId) -> Result<MatchOutcome, SessionError> {
        let mut registry = self.registry.lock().await;
        if !registry.contains(connection_id) {
            return Err(SessionError::NotJoined);
        }

        let Some(former_partner) = registry.clear_partner(connection_id) else {
            tracing::debug!(%connection_id, "Skip while unpaired; retrying match");
            return Ok(self.pair_locked(&mut registry, connection_id, &[])?);
        };

        self.metrics.increment_skips();
        tracing::info!(%connection_id, partner_id = %former_partner, "Connection skipped partner");
        self.send_to(&former_partner, ServerMessage::PartnerSkipped);

        // The skipper is requeued even if the partner could not be.
        if let Err(err) = self.pair_locked(&mut registry, &former_partner, &[*connection_id]) {
            self.metrics.increment_internal_errors();
            tracing::error!(
                partner_id = %former_partner,
                error = %err,
                "Failed to requeue partner after skip"
            );
        }
        Ok(self.pair_locked(&mut registry, connection_id, &[former_partner])?)
    }

    /// Tear down everything known about `connection_id`.
    ///
    /// The former partner, if any, is told `partnerDisconnected` and
    /// requeued. Safe to call more than once; returns false when there was
    /// nothing left to remove.
    pub async fn disconnect(&self, connection_id: &ConnectionId) -> bool {
        let mut registry = self.registry.lock().await;
        let removed = registry.unregister(connection_id);
        let transport = self.connection_manager.remove_client(connection_id);

        if transport.is_some() {
            self.metrics.decrement_active_connections();
        }

        let Some(connection) = removed else {
            if transport.is_some() {
                tracing::info!(%connection_id, "Connection closed before joining");
            }
            return transport.is_some();
        };

        tracing::info!(
            %connection_id,
            display_name = %connection.display_name,
            "Connection left"
        );

        if let Some(partner_id) = connection.partner {
            self.send_to(&partner_id, ServerMessage::PartnerDisconnected);
            if let Err(err) = self.pair_locked(&mut registry, &partner_id, &[]) {
                self.metrics.increment_internal_errors();
                tracing::error!(%partner_id, error = %err, "Failed to requeue partner after disconnect");
            }
        }
        true
    }
}
