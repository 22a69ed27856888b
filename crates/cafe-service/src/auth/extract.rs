//! Bearer credential extraction from the `Authorization` header.

use crate::errors::AuthError;
use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Extract the bearer credential from request headers.
///
/// The header must hold exactly two space-separated tokens, the first of
/// which is exactly `Bearer`. The second is returned verbatim; nothing is
/// decoded here.
///
/// # Errors
///
/// - `MissingHeader` - no `Authorization` header
/// - `MalformedHeader` - wrong scheme, wrong token count or non-ASCII value
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        tracing::debug!(target: "cafe.auth.extract", "Missing Authorization header");
        return Err(AuthError::MissingHeader);
    };

    let value = value.to_str().map_err(|_| {
        tracing::debug!(target: "cafe.auth.extract", "Authorization header is not visible ASCII");
        AuthError::MalformedHeader("Authorization header must be bearer token.")
    })?;

    let mut tokens = value.split(' ');
    let scheme = tokens.next().unwrap_or_default();
    let credential = tokens.next();
    let extra = tokens.next();

    if scheme != "Bearer" {
        tracing::debug!(target: "cafe.auth.extract", "Authorization scheme is not Bearer");
        return Err(AuthError::MalformedHeader(
            "Authorization header must start with \"Bearer\".",
        ));
    }

    match (credential, extra) {
        (Some(token), None) if !token.is_empty() => Ok(token),
        (None, _) | (Some(""), None) => {
            tracing::debug!(target: "cafe.auth.extract", "Bearer credential missing");
            Err(AuthError::MalformedHeader("Token not found."))
        }
        _ => {
            tracing::debug!(target: "cafe.auth.extract", "Authorization header has extra tokens");
            Err(AuthError::MalformedHeader(
                "Authorization header must be bearer token.",
            ))
        }
    }
}
