//! Grade sync service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Messages
//! returned to clients name the failed check so the caller can act on it,
//! but never include key material, raw tokens, or internal error text.

use crate::auth::AuthError;
use crate::grading::GradingError;
use crate::sync::PublishError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Grade sync service error type.
///
/// Maps to HTTP status codes:
/// - InvalidToken: 401 Unauthorized
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Unprocessable: 422 Unprocessable Entity
#[derive(Debug, Error)]
pub enum GsError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl GsError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GsError::InvalidToken(_) => 401,
            GsError::BadRequest(_) => 400,
            GsError::NotFound(_) => 404,
            GsError::Unprocessable(_) => 422,
        }
    }
}

impl From<AuthError> for GsError {
    fn from(err: AuthError) -> Self {
        GsError::InvalidToken(err.to_string())
    }
}

impl From<GradingError> for GsError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::ValidationFailure(reason) => GsError::BadRequest(reason),
        }
    }
}

impl From<PublishError> for GsError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Validation(reason) => GsError::BadRequest(reason),
            PublishError::Recipients(reason) => GsError::Unprocessable(reason),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for GsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GsError::InvalidToken(reason) => {
                (StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason.clone())
            }
            GsError::BadRequest(reason) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone()),
            GsError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
            GsError::Unprocessable(reason) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE",
                reason.clone(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) =
                "Bearer realm=\"grade-sync\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::ClaimViolation;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_variants() {
        assert_eq!(
            GsError::InvalidToken("expired".to_string()).to_string(),
            "Invalid token: expired"
        );
        assert_eq!(
            GsError::BadRequest("courseId is required".to_string()).to_string(),
            "Bad request: courseId is required"
        );
        assert_eq!(
            GsError::NotFound("sync record".to_string()).to_string(),
            "Not found: sync record"
        );
        assert_eq!(
            GsError::Unprocessable("recipients".to_string()).to_string(),
            "Unprocessable: recipients"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(GsError::InvalidToken("t".to_string()).status_code(), 401);
        assert_eq!(GsError::BadRequest("t".to_string()).status_code(), 400);
        assert_eq!(GsError::NotFound("t".to_string()).status_code(), 404);
        assert_eq!(GsError::Unprocessable("t".to_string()).status_code(), 422);
    }

    #[test]
    fn test_auth_error_maps_to_invalid_token_with_reason() {
        let err: GsError = AuthError::ClaimViolation(ClaimViolation::Expired).into();
        assert!(
            matches!(&err, GsError::InvalidToken(msg) if msg.contains("expired")),
            "got {:?}",
            err
        );
    }

    #[test]
    fn test_publish_errors_map_to_client_statuses() {
        let bad: GsError = PublishError::Validation("courseId is required".to_string()).into();
        assert_eq!(bad.status_code(), 400);

        let unprocessable: GsError =
            PublishError::Recipients("exactly one recipient form".to_string()).into();
        assert_eq!(unprocessable.status_code(), 422);
    }

    #[test]
    fn test_grading_error_maps_to_bad_request() {
        let err: GsError = GradingError::ValidationFailure("scoreMaximum".to_string()).into();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_into_response_invalid_token() {
        let response = GsError::InvalidToken("token expired".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"grade-sync\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "INVALID_TOKEN");
        assert_eq!(body_json["error"]["message"], "token expired");
    }

    #[tokio::test]
    async fn test_into_response_unprocessable() {
        let response = GsError::Unprocessable("no recipients".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UNPROCESSABLE");
    }
}
