//! Key resolution for launch tokens.
//!
//! `JwksClient` fetches the learning platform's JSON Web Key Set and caches
//! the keys by `kid` with a configurable TTL.
//!
//! # Security
//!
//! - Keys are cached to reduce load on the platform and improve latency
//! - An unknown `kid` triggers a refresh so rotated keys are picked up, at
//!   most once per `min_refresh_interval`
//! - Fetches carry a bounded timeout and a bounded number of retries; any
//!   remaining failure rejects the launch
//! - No lock is held while the HTTP request is in flight

use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// HTTP timeout for a single JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts per refresh, including the first.
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Initial backoff delay between attempts.
const INITIAL_BACKOFF_MS: u64 = 100;

/// Minimum time between refreshes triggered by an unknown `kid`.
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// JSON Web Key from the platform key set.
///
/// RSA keys carry `n`/`e`; Ed25519 (OKP) keys carry `x`.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification. Keys
    /// published without one cannot be selected and are ignored.
    #[serde(default)]
    pub kid: Option<String>,

    /// Curve name for OKP keys ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key value (base64url encoded).
    #[serde(default)]
    pub x: Option<String>,

    /// RSA modulus (base64url encoded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url encoded).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm ("RS256" or "EdDSA").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Key resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyResolutionError {
    #[error("signing key not found in key set")]
    UnknownKey,

    #[error("key set unavailable")]
    Unavailable,
}

/// Maps a key identifier to a verification key.
///
/// Implementations must support rotation: a `kid` that is not currently
/// known should cause the key set to be re-read before giving up.
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> Result<Jwk, KeyResolutionError>;
}

/// Cached JWKS data.
struct CachedJwks {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Instant,
}

enum FetchFailure {
    /// Worth retrying: transport error or 5xx.
    Transient(String),
    /// Not worth retrying: 4xx or an unparseable document.
    Permanent(String),
}

/// JWKS client for fetching and caching the platform's public keys.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl JwksClient {
    /// Create a new JWKS client with the default cache TTL.
    pub fn new(jwks_url: String) -> Self {
        Self::with_ttl(jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Create a new JWKS client with custom cache TTL.
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gs.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            cache_ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Override how soon an unknown `kid` may trigger another refresh.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get a JWK by key ID, refreshing the key set when the cache is
    /// empty, expired, or does not know `kid`.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, KeyResolutionError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let now = Instant::now();
                if cached.expires_at > now {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(target: "gs.auth.jwks", "JWKS cache hit");
                        return Ok(key.clone());
                    }
                    if now.duration_since(cached.fetched_at) < self.min_refresh_interval {
                        tracing::debug!(target: "gs.auth.jwks", "Unknown kid, key set refreshed recently");
                        return Err(KeyResolutionError::UnknownKey);
                    }
                    tracing::debug!(target: "gs.auth.jwks", "Unknown kid, refreshing key set for rotation");
                }
            }
        }

        self.refresh_cache().await?;

        let cache = self.cache.read().await;
        if let Some(key) = cache.as_ref().and_then(|cached| cached.keys.get(kid)) {
            return Ok(key.clone());
        }

        tracing::warn!(target: "gs.auth.jwks", "Key not found in JWKS after refresh");
        Err(KeyResolutionError::UnknownKey)
    }

    /// Refresh the JWKS cache by fetching from the platform.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<(), KeyResolutionError> {
        let jwks = match self.fetch_with_retry().await {
            Ok(jwks) => jwks,
            Err(e) => {
                record_jwks_refresh("error");
                return Err(e);
            }
        };

        let keys: HashMap<String, Jwk> = jwks
            .keys
            .into_iter()
            .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
            .collect();

        tracing::info!(
            target: "gs.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );
        record_jwks_refresh("success");

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys,
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        });

        Ok(())
    }

    async fn fetch_with_retry(&self) -> Result<JwksResponse, KeyResolutionError> {
        let mut backoff = INITIAL_BACKOFF_MS;
        let mut attempt = 1;

        loop {
            match self.fetch_once().await {
                Ok(jwks) => return Ok(jwks),
                Err(FetchFailure::Transient(reason)) if attempt < MAX_FETCH_ATTEMPTS => {
                    tracing::warn!(
                        target: "gs.auth.jwks",
                        attempt = attempt,
                        backoff_ms = backoff,
                        reason = %reason,
                        "JWKS fetch failed, will retry"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(FetchFailure::Transient(reason) | FetchFailure::Permanent(reason)) => {
                    tracing::error!(
                        target: "gs.auth.jwks",
                        attempt = attempt,
                        reason = %reason,
                        "JWKS fetch failed"
                    );
                    return Err(KeyResolutionError::Unavailable);
                }
            }
        }
    }

    async fn fetch_once(&self) -> Result<JwksResponse, FetchFailure> {
        tracing::debug!(target: "gs.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transient(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetchFailure::Transient(format!("status {status}")));
        }
        if !status.is_success() {
            return Err(FetchFailure::Permanent(format!("status {status}")));
        }

        response
            .json::<JwksResponse>()
            .await
            .map_err(|e| FetchFailure::Permanent(format!("invalid JWKS document: {e}")))
    }
}

#[async_trait]
impl KeyResolver for JwksClient {
    async fn resolve(&self, kid: &str) -> Result<Jwk, KeyResolutionError> {
        self.get_key(kid).await
    }
}
