//! Permission middleware for protected routes.
//!
//! Each protected route is bound to one static permission. The middleware
//! hands the rest of the request pipeline to the [`AuthorizationGate`] as
//! the protected operation, so a denied request never reaches the handler.
//! On success the verified `Claims` are inserted into request extensions
//! for handlers that take `Extension<Claims>`.

use crate::auth::AuthorizationGate;
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use tracing::instrument;

/// State for the permission middleware.
#[derive(Clone)]
pub struct PermissionState {
    /// Gate shared by every protected route.
    pub gate: AuthorizationGate,

    /// Permission this route requires.
    pub permission: &'static str,
}

/// Authorize the request for `state.permission`, then run the handler.
///
/// # Response
///
/// - The denial's own status (400, 401 or 403) and error envelope if
///   authorization fails
/// - The handler's response, unchanged, otherwise
#[instrument(skip_all, name = "cafe.middleware.auth")]
pub async fn require_permission(
    State(state): State<PermissionState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let headers = req.headers().clone();

    state
        .gate
        .authorize(&headers, state.permission, |claims| async move {
            let mut req = req;
            req.extensions_mut().insert(claims);
            next.run(req).await
        })
        .await
}

/// Wrap a method router so every method on it requires `permission`.
///
/// Merge the result with unguarded methods on the same path:
///
/// ```rust,ignore
/// get(list_drinks).merge(guarded(&gate, "post:drinks", post(create_drink)))
/// ```
pub fn guarded<S>(
    gate: &AuthorizationGate,
    permission: &'static str,
    route: MethodRouter<S>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        PermissionState {
            gate: gate.clone(),
            permission,
        },
        require_permission,
    ))
}
