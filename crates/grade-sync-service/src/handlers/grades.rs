//! Grade sync handlers.
//!
//! - `POST /api/v1/grades/sync` - Score and publish a grade
//! - `GET /api/v1/grades/sync/{course_id}/latest` - Latest publish for a course
//!
//! Both require a valid launch token (see `middleware::auth`) and answer
//! 404 while grade sync is disabled.

use crate::auth::LaunchClaims;
use crate::errors::GsError;
use crate::grading::compute_from;
use crate::models::{PublishRequest, PublishResponse};
use crate::observability::metrics::record_grade_publish;
use crate::routes::AppState;
use crate::sync::{validate_publish, SyncRecord};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/v1/grades/sync
///
/// Metadata is validated first, then the score is computed; nothing is
/// stored unless both succeed.
///
/// # Response
///
/// - 200 OK: record stored and returned
/// - 400 Bad Request: malformed body, missing ids, bad fallback score,
///   email-shaped recipient
/// - 401 Unauthorized: missing or rejected launch token
/// - 422 Unprocessable Entity: recipients not given in exactly one form
#[instrument(skip_all, name = "gs.grades.publish")]
pub async fn publish_grade(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<LaunchClaims>,
    body: axum::body::Bytes,
) -> Result<Json<PublishResponse>, GsError> {
    let result = publish(&state, &claims, &body).await;

    match &result {
        Ok(_) => record_grade_publish(200),
        Err(e) => {
            tracing::debug!(target: "gs.handlers.grades", error = %e, "Grade publish rejected");
            record_grade_publish(e.status_code());
        }
    }

    result.map(Json)
}

async fn publish(
    state: &AppState,
    claims: &LaunchClaims,
    body: &[u8],
) -> Result<PublishResponse, GsError> {
    let request: PublishRequest = serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "gs.handlers.grades", error = %e, "Invalid publish body");
        GsError::BadRequest("Invalid request body".to_string())
    })?;

    let input = request.ingest();
    let validated = validate_publish(input.meta, state.sync_cache.redact_comments())?;
    let score = compute_from(&input.checkpoints, input.late_multiplier, &input.fallback)?;
    let record = state.sync_cache.publish(&score, validated).await;

    tracing::info!(
        target: "gs.handlers.grades",
        deployment_id = claims.deployment_id.as_deref().unwrap_or_default(),
        mock_sync_id = record.mock_sync_id,
        "Grade published"
    );

    Ok(PublishResponse::from(record))
}

/// Handler for GET /api/v1/grades/sync/{course_id}/latest
///
/// # Response
///
/// - 200 OK: most recent unexpired record for the course
/// - 401 Unauthorized: missing or rejected launch token
/// - 404 Not Found: no record (normal outcome)
#[instrument(skip_all, name = "gs.grades.lookup")]
pub async fn lookup_latest(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> Result<Json<SyncRecord>, GsError> {
    state
        .sync_cache
        .lookup_latest_by_course(&course_id)
        .await
        .map(Json)
        .ok_or_else(|| GsError::NotFound("No grade sync record for course".to_string()))
}
