//! Builder patterns for launch token claims
//!
//! Produces LTI 1.3 `id_token` claim sets that pass validation by default;
//! each setter moves one claim away from the happy path.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

pub const VERSION_CLAIM: &str = "https://purl.imsglobal.org/spec/lti/claim/version";
pub const MESSAGE_TYPE_CLAIM: &str = "https://purl.imsglobal.org/spec/lti/claim/message_type";
pub const DEPLOYMENT_ID_CLAIM: &str = "https://purl.imsglobal.org/spec/lti/claim/deployment_id";
pub const CONTEXT_CLAIM: &str = "https://purl.imsglobal.org/spec/lti/claim/context";
pub const ROLES_CLAIM: &str = "https://purl.imsglobal.org/spec/lti/claim/roles";

const INSTRUCTOR_ROLE: &str = "http://purl.imsglobal.org/vocab/lis/v2/membership#Instructor";
const LEARNER_ROLE: &str = "http://purl.imsglobal.org/vocab/lis/v2/membership#Learner";

/// Builder for launch token claims
///
/// # Example
/// ```rust,ignore
/// let claims = LaunchTokenBuilder::new(TEST_ISSUER, TEST_CLIENT_ID)
///     .with_nonce("n-1")
///     .as_instructor()
///     .build();
/// ```
pub struct LaunchTokenBuilder {
    claims: Value,
}

impl LaunchTokenBuilder {
    /// Valid claims for a learner launch into course `C1`, expiring in an hour.
    pub fn new(issuer: &str, client_id: &str) -> Self {
        let now = Utc::now();
        Self {
            claims: json!({
                "iss": issuer,
                "aud": client_id,
                "sub": "learner-1",
                "exp": (now + Duration::seconds(3600)).timestamp(),
                "iat": now.timestamp(),
                VERSION_CLAIM: "1.3.0",
                MESSAGE_TYPE_CLAIM: "LtiResourceLinkRequest",
                DEPLOYMENT_ID_CLAIM: "deployment-1",
                CONTEXT_CLAIM: {"id": "C1", "title": "Intro Lab"},
                ROLES_CLAIM: [LEARNER_ROLE],
            }),
        }
    }

    pub fn with_nonce(self, nonce: &str) -> Self {
        self.with_claim("nonce", json!(nonce))
    }

    pub fn as_instructor(self) -> Self {
        self.with_claim(ROLES_CLAIM, json!([INSTRUCTOR_ROLE]))
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Replace `aud`; accepts a string or an array.
    pub fn with_audience(self, audience: Value) -> Self {
        self.with_claim("aud", audience)
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(self, seconds: i64) -> Self {
        let exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self.with_claim("exp", json!(exp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set an arbitrary claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        if let Some(claims) = self.claims.as_object_mut() {
            claims.insert(name.to_string(), value);
        }
        self
    }

    /// Remove a claim entirely.
    pub fn without_claim(mut self, name: &str) -> Self {
        if let Some(claims) = self.claims.as_object_mut() {
            claims.remove(name);
        }
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        self.claims
    }
}
