//! Authentication middleware for grade routes.
//!
//! Extracts the Bearer launch token from the Authorization header, validates
//! it (without a nonce; the nonce belongs to the launch itself), and injects
//! the claims into request extensions.

use crate::auth::{LaunchClaims, LaunchValidator};
use crate::errors::GsError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub launch_validator: Arc<LaunchValidator>,
}

/// Authentication middleware that validates launch tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <id_token>
/// ```
///
/// # Response
///
/// - Returns 401 Unauthorized with WWW-Authenticate header if token is missing or invalid
/// - Continues to next handler with [`LaunchClaims`] in extensions if token is valid
#[instrument(skip(state, req, next), name = "gs.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, GsError> {
    let auth_header = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gs.middleware.auth", "Missing Authorization header");
            GsError::InvalidToken("Missing Authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(|t| SecretString::from(t.trim().to_string()))
        .ok_or_else(|| {
            tracing::debug!(target: "gs.middleware.auth", "Invalid Authorization header format");
            GsError::InvalidToken("Invalid Authorization header format".to_string())
        })?;

    let claims: LaunchClaims = state
        .launch_validator
        .validate(token.expose_secret(), None)
        .await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
