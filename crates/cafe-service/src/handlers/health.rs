//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - the key set has been loaded at least once

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Loads the key set if it has never been fetched. Returns 200 once keys
/// are available, 503 while the key source is unreachable.
///
/// ## Security
///
/// The error message is generic; the cause is logged server-side.
#[tracing::instrument(skip_all, name = "cafe.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.gate.verifier().keys().ensure_loaded().await {
        tracing::warn!(target: "cafe.handlers.health", error = %e, "Readiness check failed: key set unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                key_set: "unavailable".to_string(),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            key_set: "loaded".to_string(),
            error: None,
        }),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn test_readiness_response_omits_absent_error() {
        let ready = ReadinessResponse {
            status: "ready".to_string(),
            key_set: "loaded".to_string(),
            error: None,
        };
        let json = serde_json::to_value(&ready).unwrap();
        assert_eq!(json, serde_json::json!({"status": "ready", "key_set": "loaded"}));
    }
}
