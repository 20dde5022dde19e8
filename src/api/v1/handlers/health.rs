/*
 * Responsibility
 * - GET /health (疎通用)
 * - session middleware を通るが gate は無し
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
