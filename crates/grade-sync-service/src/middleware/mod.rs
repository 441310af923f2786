//! Middleware for the grade sync service.
//!
//! # Components
//!
//! - `auth` - Launch token authentication for grade routes
//! - `feature_gate` - 404 for grade routes while grade sync is disabled
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod feature_gate;
pub mod http_metrics;

pub use auth::{require_auth, AuthState};
pub use feature_gate::require_grade_sync_enabled;
pub use http_metrics::http_metrics_middleware;
