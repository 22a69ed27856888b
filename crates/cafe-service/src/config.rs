//! Cafe service configuration.
//!
//! Configuration is loaded from environment variables. The issuer and the
//! key-set location are derived from `AUTH_DOMAIN` unless given explicitly.

use crate::auth::VerifierSettings;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default allow-listed signing algorithm.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::RS256;

/// Default bound on one key-set fetch, in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for `JWKS_FETCH_TIMEOUT_SECONDS`.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Cafe service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Expected `iss` claim.
    pub auth_issuer: String,

    /// URL to the issuer's key-set document.
    pub auth_jwks_url: String,

    /// Audience that verified tokens must carry.
    pub auth_audience: String,

    /// The single allow-listed signing algorithm (asymmetric only).
    pub auth_algorithm: Algorithm,

    /// Bound on one key-set fetch.
    pub jwks_fetch_timeout_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing algorithm configuration: {0}")]
    InvalidAlgorithm(String),

    #[error("Invalid key set fetch timeout configuration: {0}")]
    InvalidFetchTimeout(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| vars.get(name).filter(|v| !v.trim().is_empty()).cloned();

        let bind_address = non_empty("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let domain = non_empty("AUTH_DOMAIN").map(|d| d.trim_end_matches('/').to_string());

        let auth_issuer = non_empty("AUTH_ISSUER")
            .or_else(|| domain.as_ref().map(|d| format!("https://{d}/")))
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_ISSUER or AUTH_DOMAIN".to_string()))?;

        let auth_jwks_url = non_empty("AUTH_JWKS_URL")
            .or_else(|| {
                domain
                    .as_ref()
                    .map(|d| format!("https://{d}/.well-known/jwks.json"))
            })
            .ok_or_else(|| {
                ConfigError::MissingEnvVar("AUTH_JWKS_URL or AUTH_DOMAIN".to_string())
            })?;

        let auth_audience = non_empty("AUTH_AUDIENCE")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_AUDIENCE".to_string()))?;

        let auth_algorithm = if let Some(value) = non_empty("AUTH_ALGORITHM") {
            let algorithm: Algorithm = value.parse().map_err(|_| {
                ConfigError::InvalidAlgorithm(format!(
                    "AUTH_ALGORITHM must be a JWS algorithm name, got '{value}'"
                ))
            })?;

            if matches!(
                algorithm,
                Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
            ) {
                return Err(ConfigError::InvalidAlgorithm(format!(
                    "AUTH_ALGORITHM must be asymmetric, got '{value}'"
                )));
            }

            algorithm
        } else {
            DEFAULT_ALGORITHM
        };

        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = non_empty("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {MAX_JWKS_FETCH_TIMEOUT_SECONDS}, got {value}"
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        Ok(Config {
            bind_address,
            auth_issuer,
            auth_jwks_url,
            auth_audience,
            auth_algorithm,
            jwks_fetch_timeout_seconds,
        })
    }

    /// Bound on one key-set fetch.
    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_seconds)
    }

    /// Verification settings derived from this configuration.
    pub fn verifier_settings(&self) -> VerifierSettings {
        VerifierSettings {
            issuer: self.auth_issuer.clone(),
            audience: self.auth_audience.clone(),
            algorithm: self.auth_algorithm,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("AUTH_DOMAIN".to_string(), "cafe.auth.local".to_string()),
            ("AUTH_AUDIENCE".to_string(), "drinks".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.auth_issuer, "https://cafe.auth.local/");
        assert_eq!(
            config.auth_jwks_url,
            "https://cafe.auth.local/.well-known/jwks.json"
        );
        assert_eq!(config.auth_audience, "drinks");
        assert_eq!(config.auth_algorithm, Algorithm::RS256);
        assert_eq!(config.jwks_fetch_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_vars_explicit_overrides_domain() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("AUTH_ISSUER".to_string(), "https://issuer.example/".to_string());
        vars.insert(
            "AUTH_JWKS_URL".to_string(),
            "http://localhost:8082/.well-known/jwks.json".to_string(),
        );
        vars.insert("AUTH_ALGORITHM".to_string(), "EdDSA".to_string());
        vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "3".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.auth_issuer, "https://issuer.example/");
        assert_eq!(
            config.auth_jwks_url,
            "http://localhost:8082/.well-known/jwks.json"
        );
        assert_eq!(config.auth_algorithm, Algorithm::EdDSA);
        assert_eq!(config.jwks_fetch_timeout_seconds, 3);
    }

    #[test]
    fn test_explicit_issuer_and_jwks_without_domain() {
        let vars = HashMap::from([
            ("AUTH_ISSUER".to_string(), "https://issuer.example/".to_string()),
            (
                "AUTH_JWKS_URL".to_string(),
                "https://issuer.example/keys".to_string(),
            ),
            ("AUTH_AUDIENCE".to_string(), "drinks".to_string()),
        ]);

        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.auth_jwks_url, "https://issuer.example/keys");
    }

    #[test]
    fn test_domain_trailing_slash_is_normalized() {
        let mut vars = base_vars();
        vars.insert("AUTH_DOMAIN".to_string(), "cafe.auth.local/".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.auth_issuer, "https://cafe.auth.local/");
    }

    #[test]
    fn test_missing_issuer_source() {
        let vars = HashMap::from([("AUTH_AUDIENCE".to_string(), "drinks".to_string())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v.contains("AUTH_ISSUER")));
    }

    #[test]
    fn test_missing_audience() {
        let mut vars = base_vars();
        vars.remove("AUTH_AUDIENCE");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH_AUDIENCE"));
    }

    #[test]
    fn test_empty_audience_is_missing() {
        let mut vars = base_vars();
        vars.insert("AUTH_AUDIENCE".to_string(), "  ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH_AUDIENCE"));
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        for alg in ["HS256", "HS384", "HS512"] {
            let mut vars = base_vars();
            vars.insert("AUTH_ALGORITHM".to_string(), alg.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidAlgorithm(ref msg)) if msg.contains("asymmetric")),
                "{alg}: {result:?}"
            );
        }
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH_ALGORITHM".to_string(), "none".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidAlgorithm(_))));
    }

    #[test]
    fn test_fetch_timeout_bounds() {
        for (value, ok) in [("0", false), ("1", true), ("60", true), ("61", false), ("soon", false)] {
            let mut vars = base_vars();
            vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert_eq!(result.is_ok(), ok, "{value}: {result:?}");
            if !ok {
                assert!(matches!(result, Err(ConfigError::InvalidFetchTimeout(_))));
            }
        }
    }

    #[test]
    fn test_verifier_settings() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let settings = config.verifier_settings();

        assert_eq!(settings.issuer, "https://cafe.auth.local/");
        assert_eq!(settings.audience, "drinks");
        assert_eq!(settings.algorithm, Algorithm::RS256);
    }
}
