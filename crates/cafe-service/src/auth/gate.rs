//! Authorization gate.
//!
//! Composes extraction, verification and permission evaluation, and runs a
//! protected operation only when all three succeed. The first denial is
//! returned unchanged and the operation is never invoked.

use crate::auth::claims::Claims;
use crate::auth::extract::extract_bearer_token;
use crate::auth::jwt::TokenVerifier;
use crate::auth::permissions::check_permission;
use crate::errors::AuthError;
use crate::observability::metrics;
use axum::http::HeaderMap;
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

/// Public entry point of the authorization core.
///
/// Holds no per-request state; the only shared state lives in the
/// verifier's key set cache.
#[derive(Clone)]
pub struct AuthorizationGate {
    verifier: Arc<TokenVerifier>,
}

impl AuthorizationGate {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// The verifier this gate delegates to.
    pub fn verifier(&self) -> &Arc<TokenVerifier> {
        &self.verifier
    }

    /// Authorize a request and, on success, run `operation` with the
    /// verified claims, returning its output unchanged.
    ///
    /// # Errors
    ///
    /// The first denial from extraction, verification or permission
    /// evaluation.
    pub async fn authorize<F, Fut, T>(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
        operation: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize_request(headers, required_permission).await?;
        Ok(operation(claims).await)
    }

    /// Authorize a request without running anything.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationGate::authorize`].
    #[instrument(skip_all, fields(permission = %required_permission))]
    pub async fn authorize_request(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let result = self.evaluate(headers, required_permission).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "cafe.auth.gate", "Request authorized");
                metrics::record_auth_decision("granted");
            }
            Err(AuthError::KeySourceUnavailable(reason)) => {
                tracing::warn!(
                    target: "cafe.auth.gate",
                    reason = %reason,
                    "Authorization failed: key source unavailable"
                );
                metrics::record_auth_decision("key_source_unavailable");
            }
            Err(denial) => {
                tracing::debug!(target: "cafe.auth.gate", kind = denial.kind(), "Request denied");
                metrics::record_auth_decision(denial.kind());
            }
        }

        result
    }

    async fn evaluate(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.verifier.verify(token).await?;
        check_permission(claims, required_permission)
    }
}
