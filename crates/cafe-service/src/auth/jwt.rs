//! Signature and claims verification for cafe access tokens.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Exactly one asymmetric algorithm is accepted; the header's `alg` is
//!   compared against it before any key is looked up
//! - The signature is verified before the payload is trusted
//! - Temporal checks use no leeway
//! - Denials carry fixed descriptions; token contents are never echoed

use crate::auth::claims::Claims;
use crate::auth::jwks::{KeySetCache, KeySetError};
use crate::errors::{AuthError, ClaimsViolation};
use common::jwt::{
    decode_header, decode_payload, split_token, validate_temporal_claims_at, JwtValidationError,
};
use jsonwebtoken::{crypto, Algorithm};
use std::sync::Arc;
use tracing::instrument;

/// What a token must satisfy beyond a valid signature.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Expected `iss`.
    pub issuer: String,

    /// Audience that `aud` must contain.
    pub audience: String,

    /// The single allow-listed signing algorithm.
    pub algorithm: Algorithm,
}

/// Verifies access tokens against the issuer's key set.
pub struct TokenVerifier {
    keys: Arc<KeySetCache>,
    settings: VerifierSettings,
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeySetCache>, settings: VerifierSettings) -> Self {
        Self { keys, settings }
    }

    /// The key set cache backing this verifier.
    pub fn keys(&self) -> &Arc<KeySetCache> {
        &self.keys
    }

    /// Verify a token against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify_at`].
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, chrono::Utc::now().timestamp()).await
    }

    /// Verify a token as of the Unix timestamp `now`.
    ///
    /// # Security Checks
    ///
    /// 1. Structure (size, three base64url segments, decodable header)
    /// 2. Header `alg` equals the allow-listed algorithm
    /// 3. Header carries a `kid`, resolved through the key set cache
    /// 4. Signature over `header.payload`
    /// 5. Payload decodes into `Claims`
    /// 6. `exp`, `nbf`, `iss`, `aud`
    ///
    /// The key set cache may refresh once on a miss; nothing else retries.
    ///
    /// # Errors
    ///
    /// - `InvalidHeaderStructure` - steps 1 and 3 (missing `kid`)
    /// - `InvalidAlgorithm` - step 2
    /// - `InvalidKey` - unknown `kid`, or the key cannot verify this algorithm
    /// - `KeySourceUnavailable` - the key set could not be fetched
    /// - `InvalidSignature` - step 4
    /// - `InvalidClaims` - steps 5 and 6
    #[instrument(skip_all)]
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AuthError> {
        let parts = split_token(token).map_err(|e| {
            tracing::debug!(target: "cafe.auth.jwt", error = %e, "Token structure rejected");
            AuthError::InvalidHeaderStructure
        })?;

        let header = decode_header(&parts).map_err(|e| {
            tracing::debug!(target: "cafe.auth.jwt", error = %e, "Token header rejected");
            AuthError::InvalidHeaderStructure
        })?;

        let declared = header.alg.parse::<Algorithm>().ok();
        if declared != Some(self.settings.algorithm) {
            tracing::debug!(
                target: "cafe.auth.jwt",
                alg = %header.alg,
                allowed = ?self.settings.algorithm,
                "Token algorithm not allowed"
            );
            return Err(AuthError::InvalidAlgorithm);
        }

        let Some(kid) = header.kid else {
            tracing::debug!(target: "cafe.auth.jwt", "Token header has no kid");
            return Err(AuthError::InvalidHeaderStructure);
        };

        let key = self.keys.resolve(&kid).await.map_err(|e| match e {
            KeySetError::KeyNotFound => AuthError::InvalidKey,
            KeySetError::KeySourceUnavailable(reason) => AuthError::KeySourceUnavailable(reason),
        })?;

        if !key.supports(self.settings.algorithm) {
            tracing::warn!(
                target: "cafe.auth.jwt",
                kid = %kid,
                key_type = ?key.key_type(),
                "Resolved key cannot verify the allowed algorithm"
            );
            return Err(AuthError::InvalidKey);
        }

        let signature_valid = crypto::verify(
            parts.signature,
            parts.signing_input().as_bytes(),
            key.decoding_key(),
            self.settings.algorithm,
        )
        .unwrap_or_else(|e| {
            tracing::debug!(target: "cafe.auth.jwt", error = %e, "Signature could not be checked");
            false
        });

        if !signature_valid {
            tracing::debug!(target: "cafe.auth.jwt", kid = %kid, "Token signature invalid");
            return Err(AuthError::InvalidSignature);
        }

        let claims: Claims = decode_payload(&parts).map_err(|e| {
            tracing::debug!(target: "cafe.auth.jwt", error = %e, "Token payload rejected");
            AuthError::InvalidClaims(ClaimsViolation::Unparseable)
        })?;

        self.check_claims(&claims, now)?;

        tracing::debug!(target: "cafe.auth.jwt", "Token verified successfully");
        Ok(claims)
    }

    fn check_claims(&self, claims: &Claims, now: i64) -> Result<(), AuthError> {
        validate_temporal_claims_at(claims.exp, claims.nbf, now).map_err(|e| {
            let violation = match e {
                JwtValidationError::NotYetValid => ClaimsViolation::NotYetValid,
                _ => ClaimsViolation::Expired,
            };
            AuthError::InvalidClaims(violation)
        })?;

        if claims.iss != self.settings.issuer {
            tracing::debug!(target: "cafe.auth.jwt", "Token issuer mismatch");
            return Err(AuthError::InvalidClaims(ClaimsViolation::Issuer));
        }

        if !claims.aud.contains(&self.settings.audience) {
            tracing::debug!(target: "cafe.auth.jwt", "Token audience mismatch");
            return Err(AuthError::InvalidClaims(ClaimsViolation::Audience));
        }

        Ok(())
    }
}
