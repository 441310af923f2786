//! Launch token validation.
//!
//! Validates LTI 1.3 `id_token` JWTs using keys from the platform's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - RS256 (RSA) and EdDSA (Ed25519) signatures are accepted; the JWK's key
//!   type decides which, and a conflicting `alg` is rejected
//! - The JWT library's own time and audience checks are disabled; the
//!   ordered checks below own those semantics
//! - Error values name the failed check only, never token or key material

use crate::auth::claims::LaunchClaims;
use crate::auth::jwks::{Jwk, KeyResolver};
use crate::auth::{AuthError, ClaimViolation};
use crate::observability::metrics::record_token_validation;
use common::jwt::{decode_ed25519_public_key_jwk, extract_kid, validate_exp_at, validate_iat_at};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Validator for launch identity assertions.
pub struct LaunchValidator {
    key_resolver: Arc<dyn KeyResolver>,

    /// Expected `iss`.
    issuer: String,

    /// This tool's client id; must appear in `aud`.
    client_id: String,

    /// Tolerance applied to `exp` and `iat`.
    clock_skew: Duration,
}

impl LaunchValidator {
    /// Create a new launch validator.
    ///
    /// # Arguments
    ///
    /// * `key_resolver` - Resolves `kid` to a platform public key
    /// * `issuer` - Expected token issuer
    /// * `client_id` - Expected audience member
    /// * `clock_skew` - Tolerance for `exp` and `iat`
    pub fn new(
        key_resolver: Arc<dyn KeyResolver>,
        issuer: String,
        client_id: String,
        clock_skew: Duration,
    ) -> Self {
        Self {
            key_resolver,
            issuer,
            client_id,
            clock_skew,
        }
    }

    /// Validate a launch token against the current time.
    ///
    /// When `expected_nonce` is `Some`, the token's `nonce` must equal it.
    /// Recording that the nonce was consumed is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns the first failed check; see [`LaunchValidator::validate_at`].
    pub async fn validate(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
    ) -> Result<LaunchClaims, AuthError> {
        self.validate_at(token, expected_nonce, chrono::Utc::now().timestamp())
            .await
    }

    /// Validate a launch token against an explicit Unix timestamp.
    ///
    /// # Checks (first failure wins)
    ///
    /// 1. Parse header and extract `kid` (size-checked first)
    /// 2. Resolve the key for `kid`
    /// 3. Verify the signature and decode claims
    /// 4. Issuer
    /// 5. Audience
    /// 6. Expiry, with clock skew
    /// 7. Issued-at, with clock skew
    /// 8. Nonce, when one is expected
    /// 9. Required LTI claims: version, message type, deployment id
    ///
    /// # Errors
    ///
    /// - `AuthError::ParseFailure` - not a well-formed JWT, or claims do not decode
    /// - `AuthError::SignatureFailure` - key unknown/unavailable or signature invalid
    /// - `AuthError::ClaimViolation` - a claim check failed
    #[instrument(skip_all)]
    pub async fn validate_at(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
        now: i64,
    ) -> Result<LaunchClaims, AuthError> {
        let result = self.run_checks(token, expected_nonce, now).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "gs.auth.jwt", "Launch token validated");
                record_token_validation("success");
            }
            Err(e) => {
                let reason = e.reason();
                tracing::debug!(target: "gs.auth.jwt", reason = %reason, "Launch token rejected");
                record_token_validation(&reason);
            }
        }

        result
    }

    async fn run_checks(
        &self,
        token: &str,
        expected_nonce: Option<&str>,
        now: i64,
    ) -> Result<LaunchClaims, AuthError> {
        let kid = extract_kid(token).map_err(|e| {
            tracing::debug!(target: "gs.auth.jwt", error = ?e, "Token kid extraction failed");
            AuthError::ParseFailure
        })?;

        let jwk = self.key_resolver.resolve(&kid).await.map_err(|e| {
            tracing::debug!(target: "gs.auth.jwt", error = %e, "Key resolution failed");
            AuthError::SignatureFailure
        })?;

        let claims = verify_token(token, &jwk)?;

        if claims.iss.as_deref() != Some(self.issuer.as_str()) {
            return Err(ClaimViolation::Issuer.into());
        }

        if !claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.client_id))
        {
            return Err(ClaimViolation::Audience.into());
        }

        validate_exp_at(claims.exp, self.clock_skew, now)
            .map_err(|_| ClaimViolation::Expired)?;

        validate_iat_at(claims.iat, self.clock_skew, now)
            .map_err(|_| ClaimViolation::Premature)?;

        if let Some(expected) = expected_nonce {
            if claims.nonce.as_deref() != Some(expected) {
                return Err(ClaimViolation::NonceMismatch.into());
            }
        }

        if let Some(missing) = claims.first_missing_required_claim() {
            return Err(ClaimViolation::MissingClaim(missing).into());
        }

        Ok(claims)
    }
}

/// Verify JWT signature and extract claims.
fn verify_token(token: &str, jwk: &Jwk) -> Result<LaunchClaims, AuthError> {
    let (decoding_key, algorithm) = decoding_key_for(jwk)?;

    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation.leeway = 0;

    let token_data = decode::<LaunchClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "gs.auth.jwt", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::Json(_) | ErrorKind::Base64(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
                AuthError::ParseFailure
            }
            _ => AuthError::SignatureFailure,
        }
    })?;

    Ok(token_data.claims)
}

/// Build the decoding key and algorithm for a platform JWK.
fn decoding_key_for(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    match jwk.kty.as_str() {
        "OKP" => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                tracing::warn!(target: "gs.auth.jwt", "Unsupported OKP curve in JWK");
                return Err(AuthError::SignatureFailure);
            }
            expect_alg(jwk, "EdDSA")?;

            let x = jwk.x.as_ref().ok_or_else(|| {
                tracing::warn!(target: "gs.auth.jwt", "OKP JWK missing x field");
                AuthError::SignatureFailure
            })?;
            let public_key_bytes = decode_ed25519_public_key_jwk(x).map_err(|e| {
                tracing::warn!(target: "gs.auth.jwt", error = %e, "Invalid public key encoding");
                AuthError::SignatureFailure
            })?;

            Ok((DecodingKey::from_ed_der(&public_key_bytes), Algorithm::EdDSA))
        }
        "RSA" => {
            expect_alg(jwk, "RS256")?;

            let (Some(n), Some(e)) = (jwk.n.as_ref(), jwk.e.as_ref()) else {
                tracing::warn!(target: "gs.auth.jwt", "RSA JWK missing modulus or exponent");
                return Err(AuthError::SignatureFailure);
            };
            let key = DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::warn!(target: "gs.auth.jwt", error = %e, "Invalid RSA key components");
                AuthError::SignatureFailure
            })?;

            Ok((key, Algorithm::RS256))
        }
        other => {
            tracing::warn!(target: "gs.auth.jwt", kty = %other, "Unsupported JWK key type");
            Err(AuthError::SignatureFailure)
        }
    }
}

fn expect_alg(jwk: &Jwk, expected: &str) -> Result<(), AuthError> {
    match jwk.alg.as_deref() {
        Some(alg) if alg != expected => {
            tracing::warn!(target: "gs.auth.jwt", alg = %alg, "JWK algorithm does not match key type");
            Err(AuthError::SignatureFailure)
        }
        _ => Ok(()),
    }
}
