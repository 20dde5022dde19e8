//! HTTP-level middleware (cross-cutting concerns).
//!
//! This module is for transport/infrastructure concerns that should apply to
//! all routes, regardless of API version.
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Keeping credentials out of traces (token header, issuer key)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limits and global timeouts, both taken from `Config`
//!
//! Layer order, outermost first:
//! request id → credential redaction → TraceLayer → limit/timeout → routes.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::{Request, StatusCode, header::Entry, header::HeaderName};
use axum::middleware::{self, Next};
use axum::response::Response;
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use crate::rbac::Rbac;
use crate::state::ISSUER_KEY_HEADER;

#[derive(Debug, Clone, Copy)]
pub struct HttpLimits {
    pub body_limit_bytes: usize,
    pub timeout: Duration,
}

/// Apply HTTP-level middleware to the given Router.
///
/// The credential header is looked up on `rbac` for every request, so a
/// rename through `Rbac::set_token_header_name` stays redacted.
pub fn apply(router: Router, rbac: Rbac, limits: HttpLimits) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let guards = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(RequestBodyLimitLayer::new(limits.body_limit_bytes))
        .layer(TimeoutLayer::new(limits.timeout));

    router
        .layer(guards)
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([HeaderName::from_static(
            ISSUER_KEY_HEADER,
        )]))
        .layer(middleware::from_fn_with_state(rbac, redact_credential))
        // Generate a request id if missing, then propagate it to the response.
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
}

async fn redact_credential(State(rbac): State<Rbac>, mut req: Request<Body>, next: Next) -> Response {
    if let Entry::Occupied(mut entry) = req.headers_mut().entry(rbac.token_header_name()) {
        for value in entry.iter_mut() {
            value.set_sensitive(true);
        }
    }
    next.run(req).await
}
