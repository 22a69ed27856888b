//! Common utilities shared across cafe components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (structure, header decoding, temporal claims)
pub mod jwt;

/// Module for deterministic signing keys and test token builders
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
