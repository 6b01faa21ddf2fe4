use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::error_codes::ErrorCode;
use super::types::PayloadKind;

/// Message types sent from client to server
///
/// Variant and field aliases accept the envelope names used by the legacy
/// web client (`setUsername`, `message`, `offer`, `answer`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Establish identity and enter the waiting pool (MUST precede chatting)
    #[serde(alias = "setUsername")]
    Join {
        #[serde(alias = "username")]
        display_name: String,
        /// Token produced by the human-verification widget, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verification_token: Option<String>,
    },
    /// Chat content for the current partner
    #[serde(alias = "message")]
    Content {
        #[serde(default, alias = "messageType")]
        payload_kind: PayloadKind,
        #[serde(alias = "content")]
        data: String,
    },
    /// Typing indicator for the current partner
    Typing,
    /// WebRTC session description offer
    #[serde(alias = "offer")]
    VideoOffer {
        #[serde(alias = "offer")]
        sdp: Value,
    },
    /// WebRTC session description answer
    #[serde(alias = "answer")]
    VideoAnswer {
        #[serde(alias = "answer")]
        sdp: Value,
    },
    /// WebRTC ICE candidate
    Candidate { candidate: Value },
    /// Leave the current partner and look for a new one
    Skip,
    /// Client heartbeat
    Ping,
    /// Reply to a server liveness probe
    Pong,
}

impl ClientMessage {
    /// Every `type` tag (including aliases) this server understands.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "join",
        "setUsername",
        "content",
        "message",
        "typing",
        "videoOffer",
        "offer",
        "videoAnswer",
        "answer",
        "candidate",
        "skip",
        "ping",
        "pong",
    ];

    /// Parse one inbound text frame.
    ///
    /// A well-formed object with an unrecognized `type` is
    /// [`EnvelopeError::UnknownType`]; every other failure maps to
    /// `MALFORMED_ENVELOPE` via [`EnvelopeError::error_code`].
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(raw).map_err(EnvelopeError::InvalidJson)?;
        let message_type = value
            .as_object()
            .ok_or(EnvelopeError::NotAnObject)?
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingType)?;

        if !Self::KNOWN_TYPES.contains(&message_type) {
            return Err(EnvelopeError::UnknownType(message_type.to_string()));
        }

        serde_json::from_value(value).map_err(EnvelopeError::InvalidFields)
    }

    /// Envelope name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Content { .. } => "content",
            Self::Typing => "typing",
            Self::VideoOffer { .. } => "videoOffer",
            Self::VideoAnswer { .. } => "videoAnswer",
            Self::Candidate { .. } => "candidate",
            Self::Skip => "skip",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// Split off the forwardable payload, handing back control messages untouched.
    pub fn into_relay(self) -> Result<RelayEnvelope, Self> {
        match self {
            Self::Content { payload_kind, data } => {
                Ok(RelayEnvelope::Content { payload_kind, data })
            }
            Self::Typing => Ok(RelayEnvelope::Typing),
            Self::VideoOffer { sdp } => Ok(RelayEnvelope::VideoOffer { sdp }),
            Self::VideoAnswer { sdp } => Ok(RelayEnvelope::VideoAnswer { sdp }),
            Self::Candidate { candidate } => Ok(RelayEnvelope::Candidate { candidate }),
            other => Err(other),
        }
    }
}

/// Payload that is forwarded verbatim from one partner to the other.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEnvelope {
    Content { payload_kind: PayloadKind, data: String },
    Typing,
    VideoOffer { sdp: Value },
    VideoAnswer { sdp: Value },
    Candidate { candidate: Value },
}

impl RelayEnvelope {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::Typing => "typing",
            Self::VideoOffer { .. } => "videoOffer",
            Self::VideoAnswer { .. } => "videoAnswer",
            Self::Candidate { .. } => "candidate",
        }
    }

    /// Build the outbound message, attributing content and session
    /// descriptions to `sender`. ICE candidates and typing indicators are
    /// forwarded without attribution.
    pub fn into_server_message(self, sender: &str) -> ServerMessage {
        match self {
            Self::Content { payload_kind, data } => ServerMessage::Content {
                payload_kind,
                data,
                sender: sender.to_string(),
            },
            Self::Typing => ServerMessage::Typing,
            Self::VideoOffer { sdp } => ServerMessage::VideoOffer {
                sdp,
                sender: sender.to_string(),
            },
            Self::VideoAnswer { sdp } => ServerMessage::VideoAnswer {
                sdp,
                sender: sender.to_string(),
            },
            Self::Candidate { candidate } => ServerMessage::Candidate { candidate },
        }
    }
}

/// Message types sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Paired with a partner
    Matched { partner_name: String },
    /// No partner available yet; the client stays in the waiting pool
    Waiting,
    /// Chat content from the partner
    Content {
        payload_kind: PayloadKind,
        data: String,
        sender: String,
    },
    /// Partner is typing
    Typing,
    /// WebRTC offer from the partner
    VideoOffer { sdp: Value, sender: String },
    /// WebRTC answer from the partner
    VideoAnswer { sdp: Value, sender: String },
    /// ICE candidate from the partner
    Candidate { candidate: Value },
    /// The partner skipped this conversation
    PartnerSkipped,
    /// The partner's connection went away
    PartnerDisconnected,
    /// Liveness probe; clients answer with `pong`
    Ping,
    /// Reply to a client `ping`
    Pong,
    /// Error message
    Error { message: String, code: ErrorCode },
}

impl ServerMessage {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code,
        }
    }
}

/// Reasons an inbound frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("message is not an object")]
    NotAnObject,
    #[error("message has no string `type` field")]
    MissingType,
    #[error("unrecognized message type `{0}`")]
    UnknownType(String),
    #[error("invalid fields: {0}")]
    InvalidFields(#[source] serde_json::Error),
}

impl EnvelopeError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnknownType(_) => ErrorCode::UnknownMessageType,
            _ => ErrorCode::MalformedEnvelope,
        }
    }

    /// Text sent back to the client. Parser details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownType(kind) => format!("Unrecognized message type: {kind}"),
            _ => "Malformed message".to_string(),
        }
    }
}
