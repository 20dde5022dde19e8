/*
 * Responsibility
 * - derived session を返す demo handler 群
 * - /session は匿名でも 200、/me と /hidden-resource は gate の内側
 */
use axum::Json;
use serde_json::{Value, json};

use crate::api::v1::extractors::CurrentSession;

pub async fn current(session: Option<CurrentSession>) -> Json<Value> {
    Json(json!({ "session": session.map(|CurrentSession(s)| s) }))
}

pub async fn me(CurrentSession(session): CurrentSession) -> Json<Value> {
    Json(json!({ "session": session }))
}

pub async fn admin_resource(CurrentSession(session): CurrentSession) -> Json<Value> {
    Json(json!({ "resource": "hidden", "view": "admin", "role": session.role }))
}

pub async fn user_resource(CurrentSession(session): CurrentSession) -> Json<Value> {
    Json(json!({ "resource": "hidden", "view": "user", "role": session.role }))
}
