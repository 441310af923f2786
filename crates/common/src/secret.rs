//! Secret wrappers for values that must never reach logs.
//!
//! Re-exports the [`secrecy`] types. `SecretString` implements `Debug` with
//! redaction, so any struct deriving `Debug` that holds one is safe to log
//! with `{:?}` or as a tracing field.
//!
//! In the grade sync service these wrap:
//! - Raw LTI `id_token` values received at launch
//! - Bearer tokens extracted from `Authorization` headers
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct LaunchBody {
//!     id_token: SecretString,
//!     nonce: Option<String>,
//! }
//!
//! let body: LaunchBody =
//!     serde_json::from_str(r#"{"id_token": "eyJ.a.b", "nonce": "n-1"}"#).unwrap();
//!
//! assert!(!format!("{body:?}").contains("eyJ.a.b"));
//! assert_eq!(body.id_token.expose_secret(), "eyJ.a.b");
//! ```

pub use secrecy::{ExposeSecret, SecretString};
