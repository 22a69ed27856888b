//! Permission evaluation for verified claims.

use crate::auth::claims::Claims;
use crate::errors::AuthError;

/// Require `required` in the claims' permission set.
///
/// Returns the claims unchanged on success so they can flow on to the
/// protected operation.
///
/// # Errors
///
/// - `PermissionsNotGranted` - the token carries no permission data at all
/// - `InsufficientPermission` - the permission set lacks `required`
///   (exact, case-sensitive match)
pub fn check_permission(claims: Claims, required: &str) -> Result<Claims, AuthError> {
    let Some(granted) = claims.permissions.as_deref() else {
        tracing::debug!(target: "cafe.auth.permissions", "Token carries no permissions claim");
        return Err(AuthError::PermissionsNotGranted);
    };

    if !granted.iter().any(|p| p == required) {
        tracing::debug!(
            target: "cafe.auth.permissions",
            required = %required,
            "Required permission not granted"
        );
        return Err(AuthError::InsufficientPermission);
    }

    Ok(claims)
}
