//! Mock learning platform JWKS endpoint
//!
//! Serves `{"keys": [...]}` from a wiremock server so tests exercise the real
//! `JwksClient` fetch path.

use crate::crypto_fixtures::TestKeypair;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock key set is served from.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running JWKS endpoint publishing a fixed set of keys.
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start a server publishing the public halves of `keys`.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        let server = MockServer::start().await;
        let body = json!({
            "keys": keys.iter().map(|key| key.jwk_json()).collect::<Vec<_>>(),
        });

        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        Self { server }
    }

    /// Full URL of the key set.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set requests served so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}
