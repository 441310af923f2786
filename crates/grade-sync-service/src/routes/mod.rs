//! HTTP routes for the grade sync service.
//!
//! Defines the Axum router and application state.

use crate::auth::{JwksClient, KeyResolver, LaunchValidator};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{
    http_metrics_middleware, require_auth, require_grade_sync_enabled, AuthState,
};
use crate::sync::GradeSyncCache;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Launch token validator, shared with the auth middleware.
    pub launch_validator: Arc<LaunchValidator>,

    /// Published grade history. One per process.
    pub sync_cache: Arc<GradeSyncCache>,
}

impl AppState {
    /// Build state that resolves keys from the configured JWKS URL.
    pub fn new(config: Config) -> Self {
        let jwks_client = JwksClient::with_ttl(
            config.lti_jwks_url.clone(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
        );
        Self::with_key_resolver(config, Arc::new(jwks_client))
    }

    /// Build state around a caller-supplied key resolver.
    pub fn with_key_resolver(config: Config, key_resolver: Arc<dyn KeyResolver>) -> Self {
        let launch_validator = Arc::new(LaunchValidator::new(
            key_resolver,
            config.lti_issuer.clone(),
            config.lti_client_id.clone(),
            config.clock_skew(),
        ));
        let sync_cache = Arc::new(GradeSyncCache::new(config.sync_cache_settings()));

        Self {
            config,
            launch_validator,
            sync_cache,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/lti/launch` - Launch token validation - public (the token is the credential)
/// - `/api/v1/grades/sync` - Publish a grade - Bearer launch token required
/// - `/api/v1/grades/sync/{course_id}/latest` - Latest publish - Bearer launch token required
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        launch_validator: Arc::clone(&state.launch_validator),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/lti/launch", post(handlers::launch))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // route_layer order: the feature gate (added last) runs before auth.
    let grade_routes = Router::new()
        .route("/api/v1/grades/sync", post(handlers::publish_grade))
        .route(
            "/api/v1/grades/sync/:course_id/latest",
            get(handlers::lookup_latest),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_grade_sync_enabled,
        ))
        .with_state(state);

    // Later layers wrap earlier ones: TraceLayer is innermost, the 30s
    // timeout wraps it, and http_metrics_middleware sees every response.
    public_routes
        .merge(metrics_routes)
        .merge(grade_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}
