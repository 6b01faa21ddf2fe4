// WebSocket module - organized into focused submodules
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-socket send and receive tasks
// - sending: envelope serialization
// - routes: HTTP route setup (ws, health, metrics) and the serve loop
// - metrics: metrics endpoint and bearer authentication

mod connection;
mod handler;
mod metrics;
mod routes;
mod sending;

pub use handler::websocket_handler;
pub use metrics::metrics_handler;
pub use routes::{cors_layer, create_router, run_server};
