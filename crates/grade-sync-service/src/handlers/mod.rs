//! HTTP request handlers for the grade sync service.

pub mod grades;
pub mod health;
pub mod launch;
pub mod metrics;

pub use grades::{lookup_latest, publish_grade};
pub use health::health_check;
pub use launch::launch;
pub use metrics::metrics_handler;
