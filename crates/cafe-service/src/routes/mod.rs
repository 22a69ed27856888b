//! HTTP routes for the cafe service.
//!
//! Defines the Axum router and application state.

use crate::auth::{AuthorizationGate, HttpKeySource, KeySetCache, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{guarded, http_metrics_middleware};
use crate::repositories::DrinksRepository;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authorization gate shared by every protected route.
    pub gate: AuthorizationGate,

    /// Drinks storage.
    pub drinks: Arc<DrinksRepository>,
}

impl AppState {
    /// Wire the authorization core against the configured key-set endpoint,
    /// with an empty drinks store.
    pub fn from_config(config: Config) -> Self {
        let source = Arc::new(HttpKeySource::new(
            config.auth_jwks_url.clone(),
            config.jwks_fetch_timeout(),
        ));
        let keys = Arc::new(KeySetCache::with_fetch_timeout(
            source,
            config.jwks_fetch_timeout(),
        ));
        let verifier = Arc::new(TokenVerifier::new(keys, config.verifier_settings()));

        Self {
            gate: AuthorizationGate::new(verifier),
            drinks: Arc::new(DrinksRepository::new()),
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (key set loaded) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `GET /drinks` - public
/// - `GET /drinks-detail` - requires `get:drinks-detail`
/// - `POST /drinks` - requires `post:drinks`
/// - `PATCH /drinks/:id` - requires `patch:drinks`
/// - `DELETE /drinks/:id` - requires `delete:drinks`
/// - 404 envelope for unknown routes
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let gate = &state.gate;

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route(
            "/drinks",
            get(handlers::list_drinks).merge(guarded(
                gate,
                "post:drinks",
                post(handlers::create_drink),
            )),
        )
        .route(
            "/drinks-detail",
            guarded(
                gate,
                "get:drinks-detail",
                get(handlers::list_drinks_detail),
            ),
        )
        .route(
            "/drinks/:id",
            guarded(gate, "patch:drinks", patch(handlers::update_drink)).merge(guarded(
                gate,
                "delete:drinks",
                delete(handlers::delete_drink),
            )),
        )
        .fallback(handlers::not_found)
        .with_state(state.clone());

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let vars = HashMap::from([
            ("AUTH_DOMAIN".to_string(), "cafe.auth.local".to_string()),
            ("AUTH_AUDIENCE".to_string(), "drinks".to_string()),
        ]);
        let state = Arc::new(AppState::from_config(Config::from_vars(&vars).unwrap()));
        build_routes(state, PrometheusBuilder::new().build_recorder().handle())
    }

    async fn call(router: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_layered_router_serves_public_and_fallback_routes() {
        let (status, _) = call(test_router(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(test_router(), "GET", "/pastries").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");
    }

    #[tokio::test]
    async fn test_layered_router_guards_before_handlers() {
        let (status, body) = call(test_router(), "DELETE", "/drinks/1").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authorization header is expected.");

        // The public method on the same path stays open
        let (status, _) = call(test_router(), "GET", "/drinks").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
