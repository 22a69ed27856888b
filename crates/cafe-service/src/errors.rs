//! Cafe service error types.
//!
//! Every failure leaving the service is rendered as the same JSON envelope:
//!
//! ```json
//! {"success": false, "error": 401, "message": "Authorization header is expected."}
//! ```
//!
//! `AuthError` is the authorization denial taxonomy. It is constructed once
//! at the point of detection and propagated unchanged to the boundary.
//! `ApiError` is the route-layer error and wraps `AuthError`.

use crate::repositories::DrinkStoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The specific claims rule a verified token violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimsViolation {
    /// Payload is not a valid claims object.
    Unparseable,
    /// `exp` is at or before the verification instant.
    Expired,
    /// `nbf` is after the verification instant.
    NotYetValid,
    /// `iss` differs from the expected issuer.
    Issuer,
    /// `aud` does not contain the expected audience.
    Audience,
}

impl fmt::Display for ClaimsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ClaimsViolation::Unparseable => "claims could not be parsed",
            ClaimsViolation::Expired => "token expired",
            ClaimsViolation::NotYetValid => "token not yet valid",
            ClaimsViolation::Issuer => "incorrect issuer",
            ClaimsViolation::Audience => "incorrect audience",
        };
        f.write_str(text)
    }
}

/// Authorization denial.
///
/// The `Display` text is the human-readable description returned to the
/// client. It never includes token contents.
///
/// Maps to HTTP status codes:
/// - PermissionsNotGranted: 400 Bad Request
/// - InsufficientPermission: 403 Forbidden
/// - everything else: 401 Unauthorized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingHeader,

    #[error("{0}")]
    MalformedHeader(&'static str),

    #[error("Unable to parse authentication token.")]
    InvalidHeaderStructure,

    #[error("Token signing algorithm is not allowed.")]
    InvalidAlgorithm,

    #[error("Unable to find the appropriate key.")]
    InvalidKey,

    #[error("Token signature is invalid.")]
    InvalidSignature,

    #[error("Incorrect claims: {0}.")]
    InvalidClaims(ClaimsViolation),

    #[error("Permissions not included in token.")]
    PermissionsNotGranted,

    #[error("Permission not found.")]
    InsufficientPermission,

    /// The key set could not be fetched. The reason is for server-side logs
    /// only; clients see the same description as `InvalidKey`.
    #[error("Unable to find the appropriate key.")]
    KeySourceUnavailable(String),
}

impl AuthError {
    /// Stable identifier for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_header",
            AuthError::MalformedHeader(_) => "malformed_header",
            AuthError::InvalidHeaderStructure => "invalid_header_structure",
            AuthError::InvalidAlgorithm => "invalid_algorithm",
            AuthError::InvalidKey => "invalid_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::InvalidClaims(_) => "invalid_claims",
            AuthError::PermissionsNotGranted => "permissions_not_granted",
            AuthError::InsufficientPermission => "insufficient_permission",
            AuthError::KeySourceUnavailable(_) => "key_source_unavailable",
        }
    }

    /// HTTP status for this denial.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::PermissionsNotGranted => StatusCode::BAD_REQUEST,
            AuthError::InsufficientPermission => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Route-layer error type.
///
/// Maps to HTTP status codes:
/// - Auth: the denial's own status
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Unprocessable: 422 Unprocessable Entity
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(denial) => denial.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DrinkStoreError> for ApiError {
    fn from(err: DrinkStoreError) -> Self {
        match err {
            DrinkStoreError::NotFound => ApiError::NotFound,
            DrinkStoreError::DuplicateTitle | DrinkStoreError::Invalid(_) => {
                ApiError::Unprocessable(err.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: u16,
    message: String,
}

fn envelope(status: StatusCode, message: String) -> Response {
    let body = ErrorEnvelope {
        success: false,
        error: status.as_u16(),
        message,
    };

    let mut response = (status, Json(body)).into_response();

    // Add WWW-Authenticate header for 401 responses
    if status == StatusCode::UNAUTHORIZED {
        if let Ok(header_value) = "Bearer realm=\"cafe-api\", error=\"invalid_token\"".parse() {
            response
                .headers_mut()
                .insert("WWW-Authenticate", header_value);
        }
    }

    response
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        envelope(self.status_code(), self.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            ApiError::Auth(denial) => return denial.into_response(),
            ApiError::BadRequest(reason) => {
                tracing::debug!(target: "cafe.errors", reason = %reason, "Bad request");
                "bad request".to_string()
            }
            ApiError::NotFound => "resource not found".to_string(),
            ApiError::Unprocessable(reason) => {
                tracing::debug!(target: "cafe.errors", reason = %reason, "Unprocessable request");
                "unprocessable".to_string()
            }
            ApiError::Internal => "internal server error".to_string(),
        };

        envelope(status, message)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_denial_status_codes() {
        let unauthorized = [
            AuthError::MissingHeader,
            AuthError::MalformedHeader("Token not found."),
            AuthError::InvalidHeaderStructure,
            AuthError::InvalidAlgorithm,
            AuthError::InvalidKey,
            AuthError::InvalidSignature,
            AuthError::InvalidClaims(ClaimsViolation::Expired),
            AuthError::KeySourceUnavailable("timeout".to_string()),
        ];
        for denial in unauthorized {
            assert_eq!(denial.status_code(), StatusCode::UNAUTHORIZED, "{denial:?}");
        }

        assert_eq!(
            AuthError::PermissionsNotGranted.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InsufficientPermission.status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_claims_description_names_the_violated_rule() {
        assert_eq!(
            AuthError::InvalidClaims(ClaimsViolation::Expired).to_string(),
            "Incorrect claims: token expired."
        );
        assert_eq!(
            AuthError::InvalidClaims(ClaimsViolation::Audience).to_string(),
            "Incorrect claims: incorrect audience."
        );
    }

    #[test]
    fn test_key_source_unavailable_hides_reason() {
        let denial = AuthError::KeySourceUnavailable("connection refused to 10.0.0.1".to_string());
        assert_eq!(denial.to_string(), AuthError::InvalidKey.to_string());
        assert_ne!(denial.kind(), AuthError::InvalidKey.kind());
    }

    #[tokio::test]
    async fn test_auth_error_into_response_envelope() {
        let response = AuthError::MissingHeader.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response.headers().get("WWW-Authenticate").unwrap();
        assert!(www_auth
            .to_str()
            .unwrap()
            .contains("Bearer realm=\"cafe-api\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(
            body_json,
            serde_json::json!({
                "success": false,
                "error": 401,
                "message": "Authorization header is expected."
            })
        );
    }

    #[tokio::test]
    async fn test_forbidden_has_no_www_authenticate() {
        let response = AuthError::InsufficientPermission.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("WWW-Authenticate").is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 403);
        assert_eq!(body_json["message"], "Permission not found.");
    }

    #[tokio::test]
    async fn test_api_error_wraps_denial_unchanged() {
        let response = ApiError::from(AuthError::PermissionsNotGranted).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 400);
        assert_eq!(body_json["message"], "Permissions not included in token.");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = ApiError::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["error"], 404);
        assert_eq!(body_json["message"], "resource not found");
    }

    #[tokio::test]
    async fn test_into_response_unprocessable_hides_reason() {
        let response = ApiError::Unprocessable("title already exists".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"], 422);
        assert_eq!(body_json["message"], "unprocessable");
    }

    #[test]
    fn test_store_errors_map_to_api_errors() {
        assert!(matches!(
            ApiError::from(DrinkStoreError::NotFound),
            ApiError::NotFound
        ));
        assert_eq!(
            ApiError::from(DrinkStoreError::DuplicateTitle).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(DrinkStoreError::Invalid("recipe must not be empty")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_into_response_bad_request_and_internal() {
        let response = ApiError::BadRequest("invalid json".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["message"], "bad request");

        let response = ApiError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["message"], "internal server error");
    }
}
