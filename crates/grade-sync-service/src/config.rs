//! Grade sync service configuration.
//!
//! Configuration is loaded from environment variables.

use crate::sync::SyncCacheSettings;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default JWKS cache TTL in seconds.
pub const DEFAULT_JWKS_CACHE_TTL_SECONDS: u64 = 300;

/// Default record retention in seconds.
pub const DEFAULT_RETENTION_SECONDS: u64 = 3600;

/// Default sync history capacity.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 30;

/// Grade sync service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected `iss` of launch tokens.
    pub lti_issuer: String,

    /// This tool's client id; launch tokens must list it in `aud`.
    pub lti_client_id: String,

    /// The platform's JWKS endpoint.
    pub lti_jwks_url: String,

    /// JWT clock skew tolerance in seconds (1..=600).
    pub jwt_clock_skew_seconds: i64,

    /// How long fetched platform keys are trusted.
    pub jwks_cache_ttl_seconds: u64,

    /// When false, grade sync endpoints answer 404.
    pub grade_sync_enabled: bool,

    /// Lifetime of a published sync record.
    pub grade_sync_retention_seconds: u64,

    /// Drop all publish comments.
    pub grade_sync_redact_comments: bool,

    /// Maximum retained sync records.
    pub grade_sync_max_history: usize,

    /// Seconds to wait for in-flight requests on shutdown.
    pub drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let lti_issuer = required(vars, "LTI_ISSUER")?;
        let lti_client_id = required(vars, "LTI_CLIENT_ID")?;
        let lti_jwks_url = required(vars, "LTI_JWKS_URL")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let max_skew = i64::try_from(MAX_CLOCK_SKEW.as_secs()).unwrap_or(i64::MAX);
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {value}"
                )));
            }

            if value > max_skew {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {max_skew} seconds, got {value}"
                )));
            }

            value
        } else {
            i64::try_from(DEFAULT_CLOCK_SKEW.as_secs()).unwrap_or(120)
        };

        let jwks_cache_ttl_seconds =
            positive(vars, "JWKS_CACHE_TTL_SECONDS", DEFAULT_JWKS_CACHE_TTL_SECONDS)?;
        let grade_sync_enabled = flag(vars, "GRADE_SYNC_ENABLED", true)?;
        let grade_sync_retention_seconds =
            positive(vars, "GRADE_SYNC_RETENTION_SECONDS", DEFAULT_RETENTION_SECONDS)?;
        let grade_sync_redact_comments = flag(vars, "GRADE_SYNC_REDACT_COMMENTS", true)?;
        let grade_sync_max_history = usize::try_from(positive(
            vars,
            "GRADE_SYNC_MAX_HISTORY",
            DEFAULT_MAX_HISTORY as u64,
        )?)
        .map_err(|_| {
            ConfigError::InvalidValue("GRADE_SYNC_MAX_HISTORY is too large".to_string())
        })?;

        let drain_seconds = if let Some(value_str) = vars.get("GS_DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "GS_DRAIN_SECONDS must be a valid integer, got '{value_str}': {e}"
                ))
            })?
        } else {
            DEFAULT_DRAIN_SECONDS
        };

        Ok(Config {
            bind_address,
            lti_issuer,
            lti_client_id,
            lti_jwks_url,
            jwt_clock_skew_seconds,
            jwks_cache_ttl_seconds,
            grade_sync_enabled,
            grade_sync_retention_seconds,
            grade_sync_redact_comments,
            grade_sync_max_history,
            drain_seconds,
        })
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.jwt_clock_skew_seconds).unwrap_or(0))
    }

    /// Settings for the grade sync cache.
    pub fn sync_cache_settings(&self) -> SyncCacheSettings {
        SyncCacheSettings {
            retention: Duration::from_secs(self.grade_sync_retention_seconds),
            capacity: self.grade_sync_max_history,
            redact_comments: self.grade_sync_redact_comments,
        }
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn positive(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = value_str.parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{name} must be a valid positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than 0"
        )));
    }

    Ok(value)
}

fn flag(vars: &HashMap<String, String>, name: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(default);
    };

    match value_str.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{name} must be true or false, got '{value_str}'"
        ))),
    }
}
