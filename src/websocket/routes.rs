use crate::server::ChatServer;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handler::websocket_handler;
use super::metrics::metrics_handler;

/// `*` allows any origin; otherwise a comma-separated origin list.
pub fn cors_layer(cors_origins: &str) -> CorsLayer {
    if cors_origins.trim() == "*" {
        return CorsLayer::permissive();
    }

    let origins: Vec<_> = cors_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("No valid CORS origins configured, using permissive CORS");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Create the Axum router with WebSocket support.
///
/// The chat socket is served on `/ws` and on `/socket`, the path older web
/// clients connect to.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<ChatServer>> {
    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/socket", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK"
}

/// Serve `server` on `listener` until `shutdown` fires.
///
/// Also drives the liveness monitor, which stops with the same token.
pub async fn run_server(
    listener: TcpListener,
    server: Arc<ChatServer>,
    cors_origins: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let liveness = tokio::spawn(server.clone().liveness_task(shutdown.child_token()));

    let app = create_router(cors_origins).with_state(server);
    let serve_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
    .await?;

    shutdown.cancel();
    if let Err(err) = liveness.await {
        tracing::warn!(error = %err, "Liveness monitor ended abnormally");
    }
    Ok(())
}
