/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - gate をどの route に掛けるかはここで決める
 * - /hidden-resource は admin (soft fail) → user の順に Fallthrough で登録
 * - /token は TOKEN_ISSUER_KEY が設定されている時だけ登録
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    health::health,
    session::{admin_resource, current, me, user_resource},
    token::issue_token,
};
use crate::error::RbacError;
use crate::middleware::{Fallthrough, gate};
use crate::rbac::AllowList;
use crate::state::AppState;

/// Gates are built here, so every role they name must already be registered.
pub fn routes(state: AppState) -> Result<Router<AppState>, RbacError> {
    let rbac = &state.rbac;

    let profile: Router<AppState> = gate::apply(
        Router::new().route("/me", get(me)),
        rbac.allow(AllowList::authorized(), false)?,
    );

    let admin_view = gate::apply(
        Router::new().route("/hidden-resource", get(admin_resource)),
        rbac.allow(["admin"], true)?,
    );
    let user_view = gate::apply(
        Router::new().route("/hidden-resource", get(user_resource)),
        rbac.allow(["user"], false)?,
    );
    let hidden_resource = Fallthrough::new().or(admin_view).or(user_view);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/session", get(current))
        .merge(profile)
        .route_service("/hidden-resource", hidden_resource);

    if state.issuance_enabled() {
        router = router.route("/token", post(issue_token));
    }

    Ok(router)
}
