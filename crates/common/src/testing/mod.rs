//! Test fixtures for services that verify cafe access tokens.
//!
//! Available to downstream crates through the `test-utils` feature. Test
//! fixtures intentionally panic on failure.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod crypto_fixtures;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use token_builders::*;

/// Issuer stamped by [`TestTokenBuilder`] unless overridden.
pub const TEST_ISSUER: &str = "https://cafe-test.auth.local/";

/// Audience stamped by [`TestTokenBuilder`] unless overridden.
pub const TEST_AUDIENCE: &str = "drinks";
