//! LTI launch handler.
//!
//! `POST /api/v1/lti/launch` validates a platform `id_token`, including the
//! nonce when one is supplied, and returns the launch context.
//!
//! # Security
//!
//! - The raw token is held as a `SecretString` and never logged
//! - Rejections name the failed check but carry no token or key material
//! - Marking the nonce as consumed is left to the nonce store in front of
//!   this service

use crate::errors::GsError;
use crate::models::{LaunchRequest, LaunchResponse};
use crate::routes::AppState;
use axum::{extract::State, Json};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/v1/lti/launch
///
/// # Response
///
/// - 200 OK: launch accepted, context returned
/// - 400 Bad Request: body is not a valid launch request
/// - 401 Unauthorized: token rejected (message names the failed check)
#[instrument(skip_all, name = "gs.launch")]
pub async fn launch(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Json<LaunchResponse>, GsError> {
    let request: LaunchRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(target: "gs.handlers.launch", error = %e, "Invalid launch body");
        GsError::BadRequest("Invalid request body".to_string())
    })?;

    let claims = state
        .launch_validator
        .validate(request.id_token.expose_secret(), request.nonce.as_deref())
        .await?;

    tracing::info!(
        target: "gs.handlers.launch",
        deployment_id = claims.deployment_id.as_deref().unwrap_or_default(),
        "Launch accepted"
    );

    Ok(Json(LaunchResponse {
        instructor: claims.has_role("Instructor"),
        issuer: claims.iss.unwrap_or_default(),
        deployment_id: claims.deployment_id.unwrap_or_default(),
        message_type: claims.message_type.unwrap_or_default(),
        version: claims.version.unwrap_or_default(),
        context_id: claims.context.map(|context| context.id),
    }))
}
