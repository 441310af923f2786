//! Launch authentication.
//!
//! Validates LTI 1.3 identity assertions (`id_token` JWTs) signed by the
//! learning platform, using keys published in the platform's JWKS.
//!
//! # Components
//!
//! - `jwks` - Key resolution: fetches and caches the platform key set
//! - `jwt` - `LaunchValidator`, the ordered validation pipeline
//! - `claims` - Launch claims structure for validated tokens

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::LaunchClaims;
pub use jwks::{JwksClient, KeyResolver};
pub use jwt::LaunchValidator;

use thiserror::Error;

/// A standard or protocol claim that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimViolation {
    #[error("issuer is not the configured platform")]
    Issuer,

    #[error("audience does not include this tool")]
    Audience,

    #[error("token has expired")]
    Expired,

    #[error("token is not yet valid")]
    Premature,

    #[error("nonce does not match the launch")]
    NonceMismatch,

    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),
}

impl ClaimViolation {
    /// Stable machine-readable code for the failed check.
    pub fn reason(&self) -> String {
        match self {
            ClaimViolation::Issuer => "issuer".to_string(),
            ClaimViolation::Audience => "audience".to_string(),
            ClaimViolation::Expired => "expired".to_string(),
            ClaimViolation::Premature => "premature".to_string(),
            ClaimViolation::NonceMismatch => "nonce".to_string(),
            ClaimViolation::MissingClaim(name) => format!("missingClaim:{name}"),
        }
    }
}

/// Launch validation failure.
///
/// Display strings identify which check failed and nothing else: no token
/// segments, key identifiers, or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("identity token is malformed")]
    ParseFailure,

    #[error("identity token signature could not be verified")]
    SignatureFailure,

    #[error("identity token rejected: {0}")]
    ClaimViolation(#[from] ClaimViolation),
}

impl AuthError {
    /// Bounded label for metrics and logs.
    pub fn reason(&self) -> String {
        match self {
            AuthError::ParseFailure => "parse".to_string(),
            AuthError::SignatureFailure => "signature".to_string(),
            AuthError::ClaimViolation(violation) => violation.reason(),
        }
    }
}
