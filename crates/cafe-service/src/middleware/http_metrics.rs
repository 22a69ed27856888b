//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Captures responses produced before any handler runs as well, such as
//! 404 for unknown routes, 405 for unsupported methods and 400/422 from
//! body extraction.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records HTTP request metrics for all responses
///
/// Applied as the outermost layer so that auth denials and framework
/// rejections are counted too.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}
