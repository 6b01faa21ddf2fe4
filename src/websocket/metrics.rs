use crate::server::ChatServer;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use std::sync::Arc;
use subtle::ConstantTimeEq;

fn enforce_metrics_auth(headers: &HeaderMap, server: &ChatServer) -> Result<(), StatusCode> {
    let Some(raw_header) = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!("Unauthorized metrics access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("Unauthorized metrics access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let authorized = server
        .config()
        .metrics_auth_token
        .as_deref()
        .is_some_and(|expected| bool::from(token.as_bytes().ct_eq(expected.as_bytes())));
    if authorized {
        tracing::debug!("Metrics access authorized via bearer token");
        return Ok(());
    }

    tracing::warn!("Unauthorized metrics access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// Counters plus a live view of the registry.
pub async fn metrics_handler(
    headers: HeaderMap,
    State(server): State<Arc<ChatServer>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if server.config().require_metrics_auth {
        enforce_metrics_auth(&headers, server.as_ref())?;
    }

    let snapshot = server.metrics().snapshot();
    let registered = server.registered_count().await;
    let waiting = server.waiting_count().await;
    let paired = server.paired_count().await;

    let mut response = serde_json::json!({
        "timestamp": snapshot.timestamp.to_rfc3339(),
        "live": {
            "transports": server.transport_count(),
            "registered": registered,
            "waiting": waiting,
            "paired": paired,
        },
    });

    match serde_json::to_value(&snapshot) {
        Ok(value) => {
            if let Some(obj) = response.as_object_mut() {
                obj.insert("serverMetrics".to_string(), value);
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize metrics snapshot");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(Json(response))
}
