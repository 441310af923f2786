//! Metrics definitions for the grade sync service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gs_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: the service's route templates, everything else is `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `outcome`: "success" or a validation failure reason (bounded by
//!   `AuthError::reason`)
//! - `result`: hit, miss

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gs_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gs_http_requests_total`, `gs_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// Captures framework-level rejections (415, 400 on bad JSON, 404, 405) as
/// well as handler responses.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gs_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.clone(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("gs_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Course ids in lookup paths are replaced with a placeholder.
fn normalize_endpoint(path: &str) -> String {
    match path {
        "/health" | "/metrics" | "/api/v1/lti/launch" | "/api/v1/grades/sync" => path.to_string(),
        _ => normalize_dynamic_endpoint(path),
    }
}

fn normalize_dynamic_endpoint(path: &str) -> String {
    // /api/v1/grades/sync/{course_id}/latest
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() == 7
        && path.starts_with("/api/v1/grades/sync/")
        && parts.last() == Some(&"latest")
    {
        return "/api/v1/grades/sync/{course_id}/latest".to_string();
    }

    "/other".to_string()
}

// ============================================================================
// Launch Token Metrics
// ============================================================================

/// Record a launch token validation outcome.
///
/// Metric: `gs_token_validations_total`
/// Labels: `outcome` ("success", "parse", "signature", "issuer", ...)
pub fn record_token_validation(outcome: &str) {
    counter!("gs_token_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a JWKS refresh attempt.
///
/// Metric: `gs_jwks_refresh_total`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &str) {
    counter!("gs_jwks_refresh_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Grade Sync Metrics
// ============================================================================

/// Record a grade publish request by response status code.
///
/// Metric: `gs_grade_publish_total`
/// Labels: `status_code`
pub fn record_grade_publish(status_code: u16) {
    counter!("gs_grade_publish_total",
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a latest-by-course lookup.
///
/// Metric: `gs_grade_lookup_total`
/// Labels: `result` (hit, miss)
pub fn record_grade_lookup(result: &str) {
    counter!("gs_grade_lookup_total",
        "result" => result.to_string()
    )
    .increment(1);
}

/// Set the number of records currently retained by the sync cache.
///
/// Metric: `gs_sync_cache_size`
#[allow(clippy::cast_precision_loss)]
pub fn set_sync_cache_size(size: usize) {
    gauge!("gs_sync_cache_size").set(size as f64);
}

// ============================================================================
// Tests
// ============================================================================
