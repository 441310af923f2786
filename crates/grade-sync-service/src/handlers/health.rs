//! Health check handler.
//!
//! `/health` is a liveness probe: it reports the process is serving and
//! whether grade sync is enabled, without checking the platform.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        grade_sync_enabled: state.config.grade_sync_enabled,
    })
}
