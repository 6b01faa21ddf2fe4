use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default constants for validation (can be overridden by config)
pub const DEFAULT_MAX_DISPLAY_NAME_LENGTH: usize = 32;

/// Opaque identifier assigned to every accepted transport session.
///
/// Identity is never derived from the remote address, since clients behind a
/// shared NAT present the same address.
pub type ConnectionId = Uuid;

/// Kind of chat content carried by a `content` envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Plain text message
    #[default]
    Text,
    /// Base64-encoded image (without the `data:` URL prefix)
    Image,
}

impl PayloadKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }
}

/// Externally observable state of a connection in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Transport is open but the client has not completed `join`
    Connecting,
    /// Registered and sitting in the waiting pool
    Unpaired,
    /// Registered and linked to a partner
    Paired { partner: ConnectionId },
    /// Transport closed or evicted; no longer tracked
    Disconnected,
}

impl SessionState {
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::Paired { .. })
    }

    pub fn partner(&self) -> Option<ConnectionId> {
        match self {
            Self::Paired { partner } => Some(*partner),
            _ => None,
        }
    }
}
