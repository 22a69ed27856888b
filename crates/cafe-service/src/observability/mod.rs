//! Observability module for the cafe service.
//!
//! Provides metrics definitions and the Prometheus recorder.

pub mod metrics;
