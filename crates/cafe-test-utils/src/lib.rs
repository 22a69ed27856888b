//! # Cafe Test Utilities
//!
//! Shared test utilities for the cafe service.
//!
//! This crate provides:
//! - Server test harness (`TestCafeServer` for E2E tests, backed by a
//!   mock key-set endpoint)
//! - Response assertions for the JSON error envelope
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cafe_test_utils::*;
//! use common::testing::{TestSigningKey, TestTokenBuilder};
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let key = TestSigningKey::rsa("key-1");
//!     let server = TestCafeServer::spawn(&[&key]).await?;
//!
//!     let token = key.sign(&TestTokenBuilder::new().build());
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/drinks-detail", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_error_envelope(response, 403, "Permission not found.").await;
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod server_harness;

// Re-export commonly used items
pub use assertions::*;
pub use server_harness::*;
