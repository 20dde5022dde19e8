//! Per-route access gate.
//!
//! Install with `route_layer` semantics so the gate only sees requests that
//! matched one of the router's routes.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::RbacError;
use crate::rbac::{Decision, Gate, Session};

/// Marker extension on a response produced by a soft-fail denial.
///
/// [`super::fallthrough::Fallthrough`] reads it to move on to the next route
/// registered for the same path.
#[derive(Debug, Clone, Copy)]
pub struct RouteSkipped;

pub fn skipped_response() -> Response {
    let mut res = StatusCode::NOT_FOUND.into_response();
    res.extensions_mut().insert(RouteSkipped);
    res
}

pub fn is_skipped(res: &Response) -> bool {
    res.extensions().get::<RouteSkipped>().is_some()
}

pub fn apply<S>(router: Router<S>, gate: Gate) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(gate, gate_middleware))
}

async fn gate_middleware(State(gate): State<Gate>, req: Request<Body>, next: Next) -> Response {
    let decision = gate.decide(req.extensions().get::<Session>());
    match decision {
        Decision::Continue => next.run(req).await,
        Decision::Skip => skipped_response(),
        Decision::Reject(value) => RbacError::AccessDenied(value).into_response(),
    }
}
