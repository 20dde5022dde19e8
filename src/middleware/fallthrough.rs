//! Several route registrations for one path, tried in order.
//!
//! axum resolves a path to exactly one handler, so "skip to the next matching
//! route" needs an explicit dispatcher. `Fallthrough` holds the candidate
//! routers and returns the first response that is not marked
//! [`RouteSkipped`](super::gate::RouteSkipped).
//!
//! ```ignore
//! let admin = gate::apply(Router::new().route("/doc", get(admin_doc)), rbac.allow(["admin"], true)?);
//! let user = gate::apply(Router::new().route("/doc", get(user_doc)), rbac.allow(["user"], false)?);
//! let app = Router::new().route_service("/doc", Fallthrough::new().or(admin).or(user));
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Request, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower::{Service, ServiceExt};

use super::gate::is_skipped;

const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone)]
pub struct Fallthrough {
    candidates: Arc<Vec<Router>>,
    body_limit: usize,
}

impl Default for Fallthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Fallthrough {
    pub fn new() -> Self {
        Self {
            candidates: Arc::new(Vec::new()),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Appends the next candidate. Earlier candidates win.
    pub fn or(mut self, router: Router) -> Self {
        Arc::make_mut(&mut self.candidates).push(router);
        self
    }

    /// The request body is buffered so every candidate can read it.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

fn rebuild(parts: &Parts, body: &Bytes) -> Request<Body> {
    let mut req = Request::new(Body::from(body.clone()));
    *req.method_mut() = parts.method.clone();
    *req.uri_mut() = parts.uri.clone();
    *req.version_mut() = parts.version;
    *req.headers_mut() = parts.headers.clone();
    *req.extensions_mut() = parts.extensions.clone();
    req
}

impl Service<Request<Body>> for Fallthrough {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let candidates = self.candidates.clone();
        let body_limit = self.body_limit;

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let body = match axum::body::to_bytes(body, body_limit).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to buffer request body");
                    return Ok(StatusCode::PAYLOAD_TOO_LARGE.into_response());
                }
            };

            for (index, router) in candidates.iter().enumerate() {
                let res = match router.clone().oneshot(rebuild(&parts, &body)).await {
                    Ok(res) => res,
                    Err(never) => match never {},
                };

                if !is_skipped(&res) {
                    return Ok(res);
                }
                tracing::debug!(candidate = index, uri = %parts.uri, "route skipped");
            }

            Ok(StatusCode::NOT_FOUND.into_response())
        })
    }
}
