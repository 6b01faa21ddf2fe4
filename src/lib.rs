#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Pairline Server
//!
//! Anonymous random one-to-one chat over WebSocket: clients join with a
//! display name, get paired with a random waiting stranger, and exchange
//! text, images and WebRTC signaling through the server.
//!
//! Everything lives in memory; there is no database and no account system.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Registry, matchmaking, relay and liveness orchestration
pub mod server;

/// Human-verification collaborator for joins
pub mod verification;

/// WebSocket connection handling
pub mod websocket;
