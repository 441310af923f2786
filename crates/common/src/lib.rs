//! Common utilities shared across the grade sync workspace.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, kid extraction, time windows)
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
