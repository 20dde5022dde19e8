//! Session derivation: credential header → `Session` in request extensions.
//!
//! Runs once per request, before any gated route. A missing or invalid
//! credential leaves the request anonymous; a session declined by the
//! verification chain ends the request with the session-rejected value.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::RbacError;
use crate::rbac::Rbac;

/// Apply session derivation to every route of `router`.
///
/// ```ignore
/// let app = middleware::session::apply(api::v1::routes(), rbac.clone());
/// ```
pub fn apply<S>(router: Router<S>, rbac: Rbac) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(rbac, session_middleware))
}

async fn session_middleware(
    State(rbac): State<Rbac>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, RbacError> {
    let header_name = rbac.token_header_name();

    // non-UTF-8 values are treated like any other undecodable credential
    let credential = req
        .headers()
        .get(&header_name)
        .map(|v| v.to_str().unwrap_or_default().to_owned());

    if let Some(session) = rbac.derive_session(credential.as_deref()).await? {
        req.extensions_mut().insert(session);
    }

    Ok(next.run(req).await)
}
