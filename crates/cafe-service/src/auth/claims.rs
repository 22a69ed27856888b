//! JWT claims structure.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `aud` claim, which issuers emit either as one string or as an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Default for Audience {
    fn default() -> Self {
        Audience::Multiple(Vec::new())
    }
}

impl Audience {
    /// Exact, case-sensitive membership test.
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(value) => value == audience,
            Audience::Multiple(values) => values.iter().any(|value| value == audience),
        }
    }
}

/// Claims of a verified access token.
///
/// A `Claims` value is only ever produced by the verifier after signature
/// and temporal checks pass. The `sub` field contains user identifiers
/// which should not be exposed in logs, so Debug redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,

    /// Subject (user or client id) - redacted in Debug output.
    pub sub: String,

    /// Audience; missing is treated as empty.
    #[serde(default)]
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Granted permissions. `None` when the issuer attached no permission
    /// data at all, which is distinct from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("iat", &self.iat)
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_deserialization_auth0_shape() {
        let json = r#"{
            "iss": "https://cafe.auth.local/",
            "sub": "auth0|barista",
            "aud": ["drinks", "https://cafe.auth.local/userinfo"],
            "iat": 1700000000,
            "exp": 1700086400,
            "azp": "client-id",
            "scope": "openid profile",
            "permissions": ["get:drinks-detail", "post:drinks"]
        }"#;

        let claims: Claims = serde_json::from_str(json).unwrap();

        assert_eq!(claims.iss, "https://cafe.auth.local/");
        assert!(claims.aud.contains("drinks"));
        assert_eq!(claims.iat, Some(1_700_000_000));
        assert!(claims.nbf.is_none());
        assert_eq!(
            claims.permissions.as_deref(),
            Some(&["get:drinks-detail".to_string(), "post:drinks".to_string()][..])
        );
    }

    #[test]
    fn test_single_string_audience() {
        let json = r#"{"iss":"i","sub":"s","aud":"drinks","exp":1}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.aud, Audience::Single("drinks".to_string()));
        assert!(claims.aud.contains("drinks"));
        assert!(!claims.aud.contains("Drinks"));
    }

    #[test]
    fn test_missing_audience_is_empty() {
        let json = r#"{"iss":"i","sub":"s","exp":1}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert!(!claims.aud.contains("drinks"));
    }

    #[test]
    fn test_missing_vs_empty_permissions() {
        let missing: Claims = serde_json::from_str(r#"{"iss":"i","sub":"s","exp":1}"#).unwrap();
        assert!(missing.permissions.is_none());

        let empty: Claims =
            serde_json::from_str(r#"{"iss":"i","sub":"s","exp":1,"permissions":[]}"#).unwrap();
        assert_eq!(empty.permissions, Some(Vec::new()));
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let claims: Claims =
            serde_json::from_str(r#"{"iss":"i","sub":"auth0|secret-user","exp":1}"#).unwrap();

        let debug_str = format!("{:?}", claims);

        assert!(!debug_str.contains("secret-user"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_missing_exp_is_rejected() {
        let result: Result<Claims, _> = serde_json::from_str(r#"{"iss":"i","sub":"s"}"#);
        assert!(result.is_err());
    }
}
