//! Cafe Service Library
//!
//! A drinks menu API for a coffee shop, guarded by bearer-token
//! authorization against an external identity provider's published keys.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth::AuthorizationGate
//!               -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key set cache, token verification, permission evaluation
//! - `config` - Service configuration from environment
//! - `errors` - Denial taxonomy and the JSON error envelope
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission and metrics middleware
//! - `models` - Drinks and response types
//! - `observability` - Prometheus metrics
//! - `repositories` - In-memory drinks storage
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
