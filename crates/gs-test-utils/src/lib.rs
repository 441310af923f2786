//! # GS Test Utilities
//!
//! Shared test utilities for the grade sync service.
//!
//! This crate provides:
//! - Deterministic Ed25519 keypairs that sign launch tokens
//! - A launch claims builder (`LaunchTokenBuilder`)
//! - A mock platform JWKS endpoint (`MockJwksServer`)
//! - Server test harness (`TestGsServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gs_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestGsServer::spawn().await?;
//!     let token = server.sign(&server.token_builder().as_instructor().build())?;
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/v1/grades/sync/C1/latest", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 404);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
