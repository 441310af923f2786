//! Test server harness for E2E testing
//!
//! Provides `TestGsServer` for spawning real grade sync server instances,
//! backed by a mock platform JWKS endpoint and a deterministic signing key.

use crate::crypto_fixtures::TestKeypair;
use crate::jwks_mock::MockJwksServer;
use crate::token_builders::LaunchTokenBuilder;
use grade_sync_service::config::Config;
use grade_sync_service::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

pub const TEST_ISSUER: &str = "https://lms.test.example.edu";
pub const TEST_CLIENT_ID: &str = "lab-signoff-tool";
pub const TEST_KID: &str = "platform-key-1";

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            routes::init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

/// Test harness for spawning the grade sync server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let server = TestGsServer::spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGsServer {
    addr: SocketAddr,
    config: Config,
    keypair: TestKeypair,
    jwks: MockJwksServer,
    _handle: JoinHandle<()>,
}

impl TestGsServer {
    /// Spawn a server with default test configuration.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(&[]).await
    }

    /// Spawn a server with extra environment-style overrides,
    /// e.g. `[("GRADE_SYNC_ENABLED", "false")]`.
    ///
    /// The server will:
    /// - Publish one signing key from a mock JWKS endpoint
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with(overrides: &[(&str, &str)]) -> Result<Self, anyhow::Error> {
        let keypair = TestKeypair::from_seed(1, TEST_KID)
            .map_err(|e| anyhow::anyhow!("Failed to create test keypair: {}", e))?;
        let jwks = MockJwksServer::start(&[&keypair]).await;

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("LTI_ISSUER".to_string(), TEST_ISSUER.to_string()),
            ("LTI_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
            ("LTI_JWKS_URL".to_string(), jwks.jwks_url()),
        ]);
        for (name, value) in overrides {
            vars.insert((*name).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config.clone()));
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            keypair,
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

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The platform key the server trusts.
    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The mock JWKS endpoint.
    pub fn jwks(&self) -> &MockJwksServer {
        &self.jwks
    }

    /// Claims builder preset with this server's issuer and client id.
    pub fn token_builder(&self) -> LaunchTokenBuilder {
        LaunchTokenBuilder::new(TEST_ISSUER, TEST_CLIENT_ID)
    }

    /// Sign claims with the trusted platform key.
    pub fn sign(&self, claims: &serde_json::Value) -> Result<String, anyhow::Error> {
        self.keypair
            .sign(claims)
            .map_err(|e| anyhow::anyhow!("Failed to sign test token: {}", e))
    }
}

impl Drop for TestGsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
