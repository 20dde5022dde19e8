use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::api::v1::dto::token::{TokenRequest, TokenResponse};
use crate::error::{AppError, RbacError};
use crate::state::{AppState, ISSUER_KEY_HEADER};

/// Issues a session token for `{role, payload}`.
///
/// Only callers presenting the issuer key get a token. The token is returned
/// in the body and in the configured token header.
pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TokenRequest>,
) -> Result<Response, RbacError> {
    let presented = headers
        .get(ISSUER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.accepts_issuer_key(presented) {
        tracing::warn!(role = %req.role, "token request without a valid issuer key");
        return Err(RbacError::AccessDenied(AppError::Unauthorized));
    }

    let token = state.rbac.issue_token(&req.role, &req.payload)?;
    let header = state.rbac.token_header_name();

    let body = TokenResponse {
        token: token.clone(),
        header: header.to_string(),
    };
    let mut res = (StatusCode::CREATED, Json(body)).into_response();

    match HeaderValue::from_str(&token) {
        Ok(mut value) => {
            value.set_sensitive(true);
            res.headers_mut().insert(header, value);
        }
        Err(err) => tracing::warn!(error = %err, "token is not a valid header value"),
    }

    Ok(res)
}
