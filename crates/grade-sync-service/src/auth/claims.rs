//! LTI launch claims structure.
//!
//! Contains the claims extracted from validated launch tokens. The `sub`
//! field identifies a learner and is redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `aud` claim: a single client id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    /// Whether `client_id` is one of the audiences.
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

/// Course context the launch originated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchContext {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Claims carried by an LTI 1.3 launch `id_token`.
///
/// Protocol claims use their IMS URIs on the wire. `version`,
/// `message_type` and `deployment_id` are optional here so that their
/// absence is reported as a claim violation rather than a parse failure.
#[derive(Clone, Serialize, Deserialize)]
pub struct LaunchClaims {
    /// Issuer (the platform).
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience (this tool's client id).
    #[serde(default)]
    pub aud: Option<Audience>,

    /// Subject (platform user id) - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/message_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub message_type: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/deployment_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub deployment_id: Option<String>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub context: Option<LaunchContext>,

    #[serde(
        rename = "https://purl.imsglobal.org/spec/lti/claim/roles",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<String>,
}

impl fmt::Debug for LaunchClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchClaims")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("version", &self.version)
            .field("message_type", &self.message_type)
            .field("deployment_id", &self.deployment_id)
            .field("context", &self.context)
            .field("roles", &self.roles)
            .finish()
    }
}

impl LaunchClaims {
    /// Name of the first protocol-required claim that is absent, in
    /// `version`, `message_type`, `deployment_id` order.
    pub fn first_missing_required_claim(&self) -> Option<&'static str> {
        if self.version.is_none() {
            Some("version")
        } else if self.message_type.is_none() {
            Some("message_type")
        } else if self.deployment_id.is_none() {
            Some("deployment_id")
        } else {
            None
        }
    }

    /// Check if the launch carries a role. Accepts either the full IMS role
    /// URI or its short suffix (e.g. `Instructor`).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .iter()
            .any(|r| r == role || r.rsplit('#').next() == Some(role))
    }
}
