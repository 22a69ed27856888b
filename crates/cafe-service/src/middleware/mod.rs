//! Middleware for the cafe service.
//!
//! # Components
//!
//! - `auth` - Per-route permission enforcement through the authorization gate
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::{guarded, require_permission, PermissionState};
pub use http_metrics::http_metrics_middleware;
