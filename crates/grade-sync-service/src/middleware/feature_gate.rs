//! Grade sync feature flag.

use crate::errors::GsError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;

/// Reject grade sync requests with 404 while `GRADE_SYNC_ENABLED` is off.
///
/// Runs before authentication, so a disabled subsystem answers 404 even to
/// unauthenticated callers.
pub async fn require_grade_sync_enabled(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, GsError> {
    if !state.config.grade_sync_enabled {
        tracing::debug!(target: "gs.middleware.feature_gate", "Grade sync disabled");
        return Err(GsError::NotFound("Grade sync is disabled".to_string()));
    }

    Ok(next.run(req).await)
}
