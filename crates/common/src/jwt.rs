//! JWT utilities shared across cafe services.
//!
//! This module provides the unverified, structural half of JWT handling:
//! - Size limits for DoS prevention
//! - Splitting a compact JWS into its three segments
//! - Header decoding (`alg`, `kid`) for key lookup
//! - Payload decoding into a caller-chosen claims type
//! - Temporal (`exp` / `nbf`) claim checks
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing in this module verifies a signature. A decoded header or payload
//!   MUST NOT be trusted until the caller has verified the signature over
//!   [`TokenParts::signing_input`] with a key from a trusted key set.
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{split_token, decode_header, decode_payload, validate_temporal_claims_at};
//!
//! let parts = split_token(token)?;
//! let header = decode_header(&parts)?;
//! // ... look up header.kid, verify signature over parts.signing_input() ...
//! let claims: MyClaims = decode_payload(&parts)?;
//! validate_temporal_claims_at(claims.exp, claims.nbf, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Typical access tokens are well under 2KB even with a
/// generous permission list.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural JWT validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds the maximum allowed size")]
    TokenTooLarge,

    /// Token is not three dot-separated base64url segments.
    #[error("token is not a three-part compact JWS")]
    MalformedToken,

    /// Header segment does not decode to a JSON object with a string `alg`.
    #[error("token header could not be decoded")]
    MalformedHeader,

    /// Payload segment does not decode into the requested claims type.
    #[error("token payload could not be decoded")]
    MalformedPayload,

    /// `exp` is at or before the verification instant.
    #[error("token has expired")]
    Expired,

    /// `nbf` is after the verification instant.
    #[error("token is not yet valid")]
    NotYetValid,
}

// =============================================================================
// Types
// =============================================================================

/// The three segments of a compact JWS, borrowed from the original token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    /// base64url-encoded header.
    pub header: &'a str,
    /// base64url-encoded payload.
    pub payload: &'a str,
    /// base64url-encoded signature.
    pub signature: &'a str,
}

impl TokenParts<'_> {
    /// The bytes the signature is computed over: `header.payload`.
    #[must_use]
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }
}

/// Decoded (unverified) JWT header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm, verbatim.
    pub alg: String,
    /// Key identifier, present only when it is a non-empty string.
    pub kid: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Split a token into its three segments.
///
/// Checks the size limit first, then requires exactly three non-empty
/// segments drawn from the base64url alphabet (no padding).
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong segment count, empty segment or bad alphabet
pub fn split_token(token: &str) -> Result<TokenParts<'_>, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        tracing::debug!(target: "common.jwt", "Token rejected: not three segments");
        return Err(JwtValidationError::MalformedToken);
    };

    if ![header, payload, signature]
        .iter()
        .all(|segment| is_base64url_segment(segment))
    {
        tracing::debug!(target: "common.jwt", "Token rejected: segment is not base64url");
        return Err(JwtValidationError::MalformedToken);
    }

    Ok(TokenParts {
        header,
        payload,
        signature,
    })
}

fn is_base64url_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Decode the header segment without verifying the signature.
///
/// A `kid` that is missing, not a string, or empty is reported as `None`;
/// callers decide whether that is fatal.
///
/// # Errors
///
/// Returns `MalformedHeader` for bad base64, non-JSON content or a missing
/// or non-string `alg`.
pub fn decode_header(parts: &TokenParts<'_>) -> Result<TokenHeader, JwtValidationError> {
    let header_bytes = URL_SAFE_NO_PAD.decode(parts.header).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedHeader
    })?;

    let header: serde_json::Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedHeader
    })?;

    let alg = header
        .get("alg")
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MalformedHeader)?;

    let kid = header
        .get("kid")
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(TokenHeader { alg, kid })
}

/// Decode the payload segment into `T` without verifying the signature.
///
/// # Errors
///
/// Returns `MalformedPayload` for bad base64 or JSON that does not match `T`.
pub fn decode_payload<T: DeserializeOwned>(
    parts: &TokenParts<'_>,
) -> Result<T, JwtValidationError> {
    let payload_bytes = URL_SAFE_NO_PAD.decode(parts.payload).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT payload base64");
        JwtValidationError::MalformedPayload
    })?;

    serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedPayload
    })
}

/// Temporal validation against an explicit `now` timestamp.
///
/// No leeway is applied: `exp` must be strictly after `now`, and `nbf`, when
/// present, must not be after `now`.
///
/// # Errors
///
/// - `Expired` - `exp <= now`
/// - `NotYetValid` - `nbf > now`
pub fn validate_temporal_claims_at(
    exp: i64,
    nbf: Option<i64>,
    now: i64,
) -> Result<(), JwtValidationError> {
    if exp <= now {
        tracing::debug!(target: "common.jwt", exp = exp, now = now, "Token rejected: expired");
        return Err(JwtValidationError::Expired);
    }

    if let Some(nbf) = nbf {
        if nbf > now {
            tracing::debug!(target: "common.jwt", nbf = nbf, now = now, "Token rejected: not yet valid");
            return Err(JwtValidationError::NotYetValid);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.cGF5bG9hZA.c2lnbmF0dXJl")
    }

    // -------------------------------------------------------------------------
    // split_token Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_split_token_valid() {
        let parts = split_token("aGVhZGVy.cGF5bG9hZA.c2ln").unwrap();
        assert_eq!(parts.header, "aGVhZGVy");
        assert_eq!(parts.payload, "cGF5bG9hZA");
        assert_eq!(parts.signature, "c2ln");
        assert_eq!(parts.signing_input(), "aGVhZGVy.cGF5bG9hZA");
    }

    #[test]
    fn test_split_token_wrong_segment_count() {
        assert_eq!(split_token(""), Err(JwtValidationError::MalformedToken));
        assert_eq!(split_token("single"), Err(JwtValidationError::MalformedToken));
        assert_eq!(split_token("only.two"), Err(JwtValidationError::MalformedToken));
        assert_eq!(
            split_token("not.a.valid.jwt"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_split_token_empty_segment() {
        assert_eq!(
            split_token(".payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            split_token("header.payload."),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_split_token_rejects_non_base64url_alphabet() {
        assert_eq!(
            split_token("!!!invalid!!!.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
        // Padding and standard-alphabet characters are not base64url
        assert_eq!(
            split_token("aGVhZGVy==.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
        assert_eq!(
            split_token("a+b/.payload.signature"),
            Err(JwtValidationError::MalformedToken)
        );
    }

    #[test]
    fn test_split_token_oversized() {
        let token = format!("{}.payload.signature", "a".repeat(MAX_JWT_SIZE_BYTES));
        assert_eq!(split_token(&token), Err(JwtValidationError::TokenTooLarge));
    }

    #[test]
    fn test_split_token_exactly_at_limit() {
        let padding = "a".repeat(MAX_JWT_SIZE_BYTES - "..sig".len() - 1);
        let token = format!("{padding}.p.sig");
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);
        assert!(split_token(&token).is_ok());
    }

    // -------------------------------------------------------------------------
    // decode_header Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_header_reads_alg_and_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#);
        let parts = split_token(&token).unwrap();
        let header = decode_header(&parts).unwrap();

        assert_eq!(header.alg, "RS256");
        assert_eq!(header.kid.as_deref(), Some("key-01"));
    }

    #[test]
    fn test_decode_header_keeps_unknown_alg_verbatim() {
        let token = token_with_header(r#"{"alg":"none","kid":"key-01"}"#);
        let parts = split_token(&token).unwrap();
        assert_eq!(decode_header(&parts).unwrap().alg, "none");
    }

    #[test]
    fn test_decode_header_missing_alg() {
        let token = token_with_header(r#"{"typ":"JWT","kid":"key-01"}"#);
        let parts = split_token(&token).unwrap();
        assert_eq!(
            decode_header(&parts),
            Err(JwtValidationError::MalformedHeader)
        );
    }

    #[test]
    fn test_decode_header_invalid_json() {
        let token = token_with_header("not-json");
        let parts = split_token(&token).unwrap();
        assert_eq!(
            decode_header(&parts),
            Err(JwtValidationError::MalformedHeader)
        );
    }

    #[test]
    fn test_decode_header_non_string_kid_is_none() {
        for header in [
            r#"{"alg":"RS256","kid":12345}"#,
            r#"{"alg":"RS256","kid":null}"#,
            r#"{"alg":"RS256","kid":""}"#,
            r#"{"alg":"RS256"}"#,
        ] {
            let token = token_with_header(header);
            let parts = split_token(&token).unwrap();
            assert!(decode_header(&parts).unwrap().kid.is_none(), "{header}");
        }
    }

    #[test]
    fn test_decode_header_kid_with_special_chars() {
        let token = token_with_header(r#"{"alg":"RS256","kid":"key-with-special_chars.123"}"#);
        let parts = split_token(&token).unwrap();
        assert_eq!(
            decode_header(&parts).unwrap().kid.as_deref(),
            Some("key-with-special_chars.123")
        );
    }

    // -------------------------------------------------------------------------
    // decode_payload Tests
    // -------------------------------------------------------------------------

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        sub: String,
        exp: i64,
    }

    #[test]
    fn test_decode_payload() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"alice","exp":42,"extra":true}"#);
        let token = format!("aGVhZGVy.{payload}.c2ln");
        let parts = split_token(&token).unwrap();

        let sample: Sample = decode_payload(&parts).unwrap();
        assert_eq!(
            sample,
            Sample {
                sub: "alice".to_string(),
                exp: 42
            }
        );
    }

    #[test]
    fn test_decode_payload_type_mismatch() {
        let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#);
        let token = format!("aGVhZGVy.{payload}.c2ln");
        let parts = split_token(&token).unwrap();

        let result: Result<Sample, _> = decode_payload(&parts);
        assert_eq!(result, Err(JwtValidationError::MalformedPayload));
    }

    // -------------------------------------------------------------------------
    // Temporal claim Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_exp_boundary() {
        let now = 1_700_000_000;
        assert_eq!(
            validate_temporal_claims_at(now, None, now),
            Err(JwtValidationError::Expired)
        );
        assert_eq!(
            validate_temporal_claims_at(now - 1, None, now),
            Err(JwtValidationError::Expired)
        );
        assert!(validate_temporal_claims_at(now + 1, None, now).is_ok());
    }

    #[test]
    fn test_nbf_boundary() {
        let now = 1_700_000_000;
        let exp = now + 3600;
        assert!(validate_temporal_claims_at(exp, Some(now), now).is_ok());
        assert!(validate_temporal_claims_at(exp, Some(now - 60), now).is_ok());
        assert_eq!(
            validate_temporal_claims_at(exp, Some(now + 1), now),
            Err(JwtValidationError::NotYetValid)
        );
    }
}
