//! Test server harness for E2E testing
//!
//! Provides `TestCafeServer` for spawning real cafe server instances in
//! tests. Each instance gets its own mock key-set endpoint, its own drinks
//! store and its own Prometheus handle.

use cafe_service::config::Config;
use cafe_service::routes::{self, AppState};
use common::testing::{jwks_document, TestSigningKey, TEST_AUDIENCE, TEST_ISSUER};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock identity provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Test harness for spawning the cafe server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health_flow_e2e() -> Result<(), anyhow::Error> {
///     let server = TestCafeServer::spawn(&[&TestSigningKey::rsa("key-1")]).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCafeServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    jwks: MockServer,
    _handle: JoinHandle<()>,
}

impl TestCafeServer {
    /// Spawn a server that trusts `keys` and the default RS256 algorithm.
    pub async fn spawn(keys: &[&TestSigningKey]) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(keys, HashMap::new()).await
    }

    /// Spawn a server whose allow-listed algorithm is `algorithm`.
    pub async fn spawn_with_algorithm(
        keys: &[&TestSigningKey],
        algorithm: &str,
    ) -> Result<Self, anyhow::Error> {
        let vars = HashMap::from([("AUTH_ALGORITHM".to_string(), algorithm.to_string())]);
        Self::spawn_with_vars(keys, vars).await
    }

    /// Spawn a server whose key-set endpoint fails every request.
    pub async fn spawn_with_unavailable_key_source() -> Result<Self, anyhow::Error> {
        let server = Self::spawn(&[]).await?;
        server.fail_key_source().await;
        Ok(server)
    }

    /// Spawn a server with extra configuration variables.
    ///
    /// The server will:
    /// - Serve `keys` from a fresh mock key-set endpoint
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        keys: &[&TestSigningKey],
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let jwks = MockServer::start().await;
        mount_key_set(&jwks, keys).await;

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_ISSUER".to_string(), TEST_ISSUER.to_string()),
            (
                "AUTH_JWKS_URL".to_string(),
                format!("{}{}", jwks.uri(), JWKS_PATH),
            ),
            ("AUTH_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config));

        // A recorder that is never installed globally, so parallel tests do
        // not fight over the process-wide recorder
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state.clone(), metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            jwks,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// The mock key-set endpoint.
    pub fn jwks_server(&self) -> &MockServer {
        &self.jwks
    }

    /// Replace the published key set, e.g. to simulate rotation.
    pub async fn publish_keys(&self, keys: &[&TestSigningKey]) {
        self.jwks.reset().await;
        mount_key_set(&self.jwks, keys).await;
    }

    /// Make the key-set endpoint answer 503 from now on.
    pub async fn fail_key_source(&self) {
        self.jwks.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&self.jwks)
            .await;
    }

    /// Number of key-set fetches the server has made so far.
    pub async fn key_set_fetches(&self) -> usize {
        self.jwks
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}

impl Drop for TestCafeServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so each test cleans up immediately
        self._handle.abort();
    }
}

async fn mount_key_set(server: &MockServer, keys: &[&TestSigningKey]) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
        .mount(server)
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let key = TestSigningKey::rsa("harness-key");
        let server = TestCafeServer::spawn(&[&key]).await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_config_points_at_mock_key_set() -> Result<(), anyhow::Error> {
        let server = TestCafeServer::spawn(&[]).await?;

        assert_eq!(
            server.config().auth_jwks_url,
            format!("{}{}", server.jwks_server().uri(), JWKS_PATH)
        );
        assert_eq!(server.config().auth_issuer, TEST_ISSUER);
        assert_eq!(server.key_set_fetches().await, 0);

        Ok(())
    }
}
