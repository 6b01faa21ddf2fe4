// Protocol module: envelope types, error codes, and input validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{ConnectionId, PayloadKind, SessionState, DEFAULT_MAX_DISPLAY_NAME_LENGTH};

pub use messages::{ClientMessage, EnvelopeError, RelayEnvelope, ServerMessage};
