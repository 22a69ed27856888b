//! Builder patterns for test token claims.
//!
//! Provides a fluent API for the claim sets tests sign with
//! [`TestSigningKey`](super::TestSigningKey).

use super::{TEST_AUDIENCE, TEST_ISSUER};
use chrono::{Duration, Utc};
use serde_json::json;

/// Builder for creating test JWT claims.
///
/// Defaults to a token from [`TEST_ISSUER`] for [`TEST_AUDIENCE`], valid for
/// an hour, carrying an empty permission list.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_subject("auth0|barista")
///     .with_permissions(&["get:drinks-detail", "post:drinks"])
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    iss: String,
    sub: String,
    aud: serde_json::Value,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
    permissions: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: TEST_ISSUER.to_string(),
            sub: "auth0|test-subject".to_string(),
            aud: json!([TEST_AUDIENCE]),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nbf: None,
            permissions: Some(Vec::new()),
        }
    }

    /// Set the subject.
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer.
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set a single-string audience.
    pub fn for_audience(mut self, audience: &str) -> Self {
        self.aud = json!(audience);
        self
    }

    /// Set an array audience.
    pub fn for_audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    /// Set the permission list.
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(ToString::to_string).collect());
        self
    }

    /// Omit the `permissions` claim entirely.
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set an absolute expiration timestamp.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = timestamp;
        self
    }

    /// Set an absolute not-before timestamp.
    pub fn not_before(mut self, timestamp: i64) -> Self {
        self.nbf = Some(timestamp);
        self
    }

    /// Set issued-at timestamp.
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> serde_json::Value {
        let mut claims = json!({
            "iss": self.iss,
            "sub": self.sub,
            "aud": self.aud,
            "exp": self.exp,
            "iat": self.iat,
        });
        if let Some(nbf) = self.nbf {
            claims["nbf"] = json!(nbf);
        }
        if let Some(permissions) = self.permissions {
            claims["permissions"] = json!(permissions);
        }
        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
