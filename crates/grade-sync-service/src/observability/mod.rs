//! Observability for the grade sync service.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
