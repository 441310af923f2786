//! JWT utilities shared by the grade sync service and its test tooling.
//!
//! This module provides the token-level checks that do not depend on a
//! particular claims shape:
//! - Size limits applied before any decoding
//! - Clock skew constants and the inclusive `exp` / `iat` windows
//! - Key ID extraction from JWT headers
//! - JWK public key decoding helpers
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Error display strings are generic; callers log details at debug level
//! - Nothing in this module ever logs token contents
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{extract_kid, validate_exp_at, validate_iat_at, DEFAULT_CLOCK_SKEW};
//!
//! let kid = extract_kid(token)?;
//! // ... resolve key, verify signature, decode claims ...
//! validate_exp_at(claims.exp, DEFAULT_CLOCK_SKEW, now)?;
//! validate_iat_at(claims.iat, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// LTI launch tokens carry more claims than a plain access token (context,
/// roles, resource link, custom parameters) but stay well under 4KB in
/// practice. Anything larger is rejected before base64 decoding or signature
/// verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance applied to `exp` and `iat` (2 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(120);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from the claims-independent JWT checks.
///
/// Display strings are intentionally generic. The variant itself carries the
/// detail callers need to map the failure onto their own taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The identity token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The identity token is invalid")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The identity token is invalid")]
    MissingKid,

    /// Token `exp` is further in the past than the skew allows.
    #[error("The identity token has expired")]
    Expired,

    /// Token `iat` is further in the future than the skew allows.
    #[error("The identity token is not yet valid")]
    IssuedInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The platform rotates its signing keys, so the `kid` selects which key
/// from the published key set verifies this token.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value must only be used for lookup in a trusted key set
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count, bad base64, or invalid JSON header
/// - `MissingKid` - Header has no `kid`, or `kid` is not a non-empty string
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    header
        .get("kid")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MissingKid)
}

/// Reject tokens whose `exp` lies more than `clock_skew` before `now`.
///
/// The boundary is inclusive: `exp == now - clock_skew` is still accepted.
///
/// # Errors
///
/// Returns `JwtValidationError::Expired` when `now > exp + clock_skew`.
pub fn validate_exp_at(exp: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let skew = skew_seconds(clock_skew);
    let latest_accepted = exp.saturating_add(skew);

    if now > latest_accepted {
        tracing::debug!(
            target: "common.jwt",
            exp = exp,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    Ok(())
}

/// Reject tokens whose `iat` lies more than `clock_skew` after `now`.
///
/// The boundary is inclusive: `iat == now + clock_skew` is still accepted.
///
/// # Errors
///
/// Returns `JwtValidationError::IssuedInFuture` when `iat - clock_skew > now`.
pub fn validate_iat_at(iat: i64, clock_skew: Duration, now: i64) -> Result<(), JwtValidationError> {
    let skew = skew_seconds(clock_skew);
    let earliest_accepted = iat.saturating_sub(skew);

    if earliest_accepted > now {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IssuedInFuture);
    }

    Ok(())
}

fn skew_seconds(clock_skew: Duration) -> i64 {
    i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX)
}

/// Decode an Ed25519 public key from a JWK `x` field (base64url, no padding).
///
/// # Errors
///
/// Returns `base64::DecodeError` if the value is not valid base64url.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_2_minutes() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::from_secs(120));
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // extract_kid Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_kid_valid_token() {
        let header = r#"{"alg":"RS256","typ":"JWT","kid":"platform-key-01"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let token = format!("{header_b64}.payload.signature");

        assert_eq!(extract_kid(&token).unwrap(), "platform-key-01");
    }

    #[test]
    fn test_extract_kid_missing_kid() {
        let header = r#"{"alg":"RS256","typ":"JWT"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let token = format!("{header_b64}.payload.signature");

        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_empty_kid_rejected() {
        let header = r#"{"alg":"RS256","kid":""}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let token = format!("{header_b64}.payload.signature");

        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_non_string_kid() {
        let header = r#"{"alg":"EdDSA","typ":"JWT","kid":12345}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let token = format!("{header_b64}.payload.signature");

        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MissingKid)
        ));
    }

    #[test]
    fn test_extract_kid_malformed_token() {
        assert!(matches!(
            extract_kid("not-a-jwt"),
            Err(JwtValidationError::MalformedToken)
        ));
        assert!(matches!(
            extract_kid("only.two"),
            Err(JwtValidationError::MalformedToken)
        ));
        assert!(matches!(
            extract_kid(""),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_kid_invalid_base64() {
        assert!(matches!(
            extract_kid("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_kid_invalid_json() {
        let header_b64 = URL_SAFE_NO_PAD.encode("not-json");
        let token = format!("{header_b64}.payload.signature");

        assert!(matches!(
            extract_kid(&token),
            Err(JwtValidationError::MalformedToken)
        ));
    }

    #[test]
    fn test_extract_kid_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            extract_kid(&oversized),
            Err(JwtValidationError::TokenTooLarge)
        ));
    }

    #[test]
    fn test_extract_kid_at_size_limit() {
        let header = r#"{"alg":"EdDSA","typ":"JWT","kid":"key"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let sig_len = remaining - payload_len;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(sig_len)
        );

        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert_eq!(extract_kid(&token).unwrap(), "key");
    }

    // -------------------------------------------------------------------------
    // validate_exp_at Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_exp_future_accepted() {
        let now = 1_700_000_000_i64;
        assert!(validate_exp_at(now + 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_exp_at_skew_edge_accepted() {
        let now = 1_700_000_000_i64;
        // exp == now - skew is the last accepted value
        assert!(validate_exp_at(now - 120, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_exp_one_second_past_edge_rejected() {
        let now = 1_700_000_000_i64;
        assert_eq!(
            validate_exp_at(now - 121, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_validate_exp_extreme_value_does_not_overflow() {
        let now = 1_700_000_000_i64;
        assert!(validate_exp_at(i64::MAX, MAX_CLOCK_SKEW, now).is_ok());
    }

    // -------------------------------------------------------------------------
    // validate_iat_at Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_iat_past_accepted() {
        let now = 1_700_000_000_i64;
        assert!(validate_iat_at(now - 3600, DEFAULT_CLOCK_SKEW, now).is_ok());
    }

    #[test]
    fn test_validate_iat_at_boundary_exact() {
        let now = 1_700_000_000_i64;

        // iat == now + skew is the last accepted value
        assert!(validate_iat_at(now + 120, DEFAULT_CLOCK_SKEW, now).is_ok());

        // iat == now + skew + 1 is the first rejected value
        assert_eq!(
            validate_iat_at(now + 121, DEFAULT_CLOCK_SKEW, now),
            Err(JwtValidationError::IssuedInFuture)
        );
    }

    #[test]
    fn test_validate_iat_minimum_skew_boundary() {
        let now = 1_700_000_000_i64;
        let one_sec = Duration::from_secs(1);

        assert!(validate_iat_at(now + 1, one_sec, now).is_ok());
        assert!(validate_iat_at(now + 2, one_sec, now).is_err());
    }

    // -------------------------------------------------------------------------
    // Key Decoding Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_ed25519_public_key_jwk() {
        let x = "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo";
        let result = decode_ed25519_public_key_jwk(x);
        assert_eq!(result.unwrap().len(), 32);
    }

    #[test]
    fn test_decode_ed25519_public_key_jwk_invalid() {
        assert!(decode_ed25519_public_key_jwk("not-valid-base64url!!!").is_err());
    }

    #[test]
    fn test_error_messages_are_generic() {
        for err in [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::MissingKid,
        ] {
            assert_eq!(err.to_string(), "The identity token is invalid");
        }
    }
}
