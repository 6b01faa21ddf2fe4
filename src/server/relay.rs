use super::{ChatServer, SessionError};
use crate::protocol::{ConnectionId, RelayEnvelope};

impl ChatServer {
    /// Forward `envelope` from `sender` to its current partner.
    ///
    /// The payload is not inspected. The partner is resolved under the
    /// registry lock; if its transport is gone by the time the message is
    /// queued, the send is silently dropped.
    pub async fn relay(
        &self,
        sender: &ConnectionId,
        envelope: RelayEnvelope,
    ) -> Result<(), SessionError> {
        let (partner_id, sender_name) = {
            let registry = self.registry.lock().await;
            let connection = registry.lookup(sender).ok_or(SessionError::NotJoined)?;
            let Some(partner_id) = connection.partner else {
                self.metrics.increment_no_partner_replies();
                return Err(SessionError::NoPartner);
            };
            (partner_id, connection.display_name.clone())
        };

        let kind = envelope.kind();
        let delivered = self.send_to(&partner_id, envelope.into_server_message(&sender_name));
        if delivered {
            self.metrics.increment_relayed_messages();
        }
        tracing::trace!(
            connection_id = %sender,
            %partner_id,
            kind,
            delivered,
            "Relayed envelope"
        );
        Ok(())
    }
}
