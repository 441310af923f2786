//! Grade Sync Service Library
//!
//! Grading backend for an LMS-integrated lab signoff tool:
//!
//! - LTI 1.3 launch token validation against the platform's JWKS
//! - Checkpoint-based grade aggregation
//! - A bounded, TTL-expiring history of published grades
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs -> grading/, sync/
//!                        |
//!                        v
//!                  auth/ (LaunchValidator -> KeyResolver/JwksClient)
//! ```
//!
//! # Modules
//!
//! - `auth` - Launch token validation and key resolution
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `grading` - Score aggregation
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication, feature gate, HTTP metrics
//! - `models` - Wire types
//! - `observability` - Metrics
//! - `routes` - Axum router setup
//! - `sync` - Publish validation and the sync record cache

pub mod auth;
pub mod config;
pub mod errors;
pub mod grading;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod sync;
