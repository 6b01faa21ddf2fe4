use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Identity errors
    InvalidIdentity,
    DuplicateRegistration,
    VerificationFailed,
    NotJoined,
    JoinTimeout,

    // Pairing errors
    NoPartner,

    // Envelope errors
    MalformedEnvelope,
    UnknownMessageType,
    MessageTooLarge,

    // Transport limits
    TooManyConnections,

    // Server errors
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// Clients may show this text directly to the user.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidIdentity => {
                "The display name is invalid. Choose a non-empty name within the allowed length."
            }
            Self::DuplicateRegistration => {
                "This connection has already joined. Open a new connection to join again."
            }
            Self::VerificationFailed => {
                "Human verification failed. Complete the verification challenge and try again."
            }
            Self::NotJoined => "You must join with a display name before chatting.",
            Self::JoinTimeout => {
                "The connection did not join in time and has been closed. Please reconnect."
            }
            Self::NoPartner => {
                "You are not connected to a partner yet. Wait for a match before sending."
            }
            Self::MalformedEnvelope => {
                "The message could not be understood. Check that it is a valid JSON envelope."
            }
            Self::UnknownMessageType => {
                "The message type is not recognized by this server and was ignored."
            }
            Self::MessageTooLarge => {
                "The message exceeds the maximum allowed size and was not delivered."
            }
            Self::TooManyConnections => {
                "Too many connections from your network. Close other sessions and retry."
            }
            Self::InternalError => {
                "An internal server error occurred. Please try again in a few moments."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
