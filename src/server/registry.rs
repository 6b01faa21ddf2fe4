//! Identity and pairing state for every joined connection.
//!
//! The registry is a plain data structure. `ChatServer` owns the only
//! instance behind a single mutex, so every method here runs inside that
//! critical section and can assume exclusive access.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

use crate::protocol::{ConnectionId, SessionState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("display name is empty")]
    InvalidIdentity,
    #[error("connection {0} is already registered")]
    DuplicateRegistration(ConnectionId),
    #[error("connection {0} is not registered")]
    NotRegistered(ConnectionId),
    #[error("connection {0} already has a partner")]
    AlreadyPaired(ConnectionId),
    #[error("connection {0} cannot be paired with itself")]
    SelfPairing(ConnectionId),
}

impl RegistryError {
    /// Invariant violations are programming errors, not client mistakes.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::AlreadyPaired(_) | Self::SelfPairing(_))
    }
}

/// One joined client.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub display_name: String,
    /// Weak link to the partner; resolve through the registry.
    pub partner: Option<ConnectionId>,
    /// Cleared by each liveness sweep, set again by any probe reply.
    pub alive: bool,
    pub joined_at: DateTime<Utc>,
}

impl Connection {
    pub fn state(&self) -> SessionState {
        match self.partner {
            Some(partner) => SessionState::Paired { partner },
            None => SessionState::Unpaired,
        }
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    connections: HashMap<ConnectionId, Connection>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Insert an unpaired connection. The stored name is trimmed.
    pub fn register(
        &mut self,
        id: ConnectionId,
        display_name: &str,
    ) -> Result<&Connection, RegistryError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(RegistryError::InvalidIdentity);
        }
        if self.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateRegistration(id));
        }

        let connection = self.connections.entry(id).or_insert(Connection {
            id,
            display_name: display_name.to_string(),
            partner: None,
            alive: true,
            joined_at: Utc::now(),
        });
        Ok(connection)
    }

    /// Remove a connection, clearing its partner's reverse link.
    ///
    /// Notifying the former partner is the caller's job.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Connection> {
        let removed = self.connections.remove(id)?;
        if let Some(partner_id) = removed.partner {
            if let Some(partner) = self.connections.get_mut(&partner_id) {
                if partner.partner == Some(*id) {
                    partner.partner = None;
                }
            }
        }
        Some(removed)
    }

    pub fn lookup(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn lookup_mut(&mut self, id: &ConnectionId) -> Option<&mut Connection> {
        self.connections.get_mut(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Link `a` and `b` to each other.
    pub fn set_partner(&mut self, a: ConnectionId, b: ConnectionId) -> Result<(), RegistryError> {
        if a == b {
            return Err(RegistryError::SelfPairing(a));
        }
        for id in [a, b] {
            match self.connections.get(&id) {
                None => return Err(RegistryError::NotRegistered(id)),
                Some(conn) if conn.partner.is_some() => {
                    return Err(RegistryError::AlreadyPaired(id))
                }
                Some(_) => {}
            }
        }

        if let Some(conn) = self.connections.get_mut(&a) {
            conn.partner = Some(b);
        }
        if let Some(conn) = self.connections.get_mut(&b) {
            conn.partner = Some(a);
        }
        Ok(())
    }

    /// Unlink `a` from its partner (both directions) and return the former partner.
    pub fn clear_partner(&mut self, a: &ConnectionId) -> Option<ConnectionId> {
        let former = self.connections.get_mut(a)?.partner.take()?;
        if let Some(partner) = self.connections.get_mut(&former) {
            if partner.partner == Some(*a) {
                partner.partner = None;
            }
        }
        Some(former)
    }

    /// Connections with no partner, excluding `exclude`.
    pub fn waiting<'a>(
        &'a self,
        exclude: &'a [ConnectionId],
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .values()
            .filter(move |conn| conn.partner.is_none() && !exclude.contains(&conn.id))
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting(&[]).count()
    }

    pub fn paired_count(&self) -> usize {
        self.iter().filter(|conn| conn.state().is_paired()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Connection> {
        self.connections.values_mut()
    }

    /// Check that pairing is symmetric and nobody is paired with themselves.
    pub fn verify_invariants(&self) -> Result<(), String> {
        for conn in self.iter() {
            let Some(partner_id) = conn.partner else {
                continue;
            };
            if partner_id == conn.id {
                return Err(format!("{} is paired with itself", conn.id));
            }
            match self.connections.get(&partner_id) {
                None => {
                    return Err(format!(
                        "{} points at unregistered partner {partner_id}",
                        conn.id
                    ))
                }
                Some(partner) if partner.partner != Some(conn.id) => {
                    return Err(format!(
                        "{} -> {partner_id} is not reciprocated (partner points at {:?})",
                        conn.id, partner.partner
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
