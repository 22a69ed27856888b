//! Authorization core for the cafe service.
//!
//! Every protected route passes through the [`AuthorizationGate`], which
//! composes the pieces below leaves-first.
//!
//! # Components
//!
//! - `jwks` - Key set cache over the issuer's published signing keys
//! - `extract` - Bearer credential extraction from the `Authorization` header
//! - `jwt` - Signature and claims verification
//! - `claims` - Claims structure for verified tokens
//! - `permissions` - Required-permission evaluation
//! - `gate` - Extraction, verification and evaluation composed around a
//!   protected operation

pub mod claims;
pub mod extract;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, Claims};
pub use gate::AuthorizationGate;
pub use jwks::{HttpKeySource, KeySetCache, KeySource};
pub use jwt::{TokenVerifier, VerifierSettings};
