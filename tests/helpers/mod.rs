//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use route_rbac::app;
use route_rbac::config::Config;
use route_rbac::state::ISSUER_KEY_HEADER;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_ISSUER_KEY: &str = "integration-issuer-key";

/// Test application context
pub struct TestApp {
    /// The full router, http and session middleware included
    pub router: Router,
    /// Header the credential travels in
    pub header: String,
    pub config: Config,
}

/// Simplified response for assertions
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    pub fn with_env(vars: &[(&str, &str)]) -> Self {
        Self::try_with_env(vars).expect("Failed to build test app")
    }

    /// `SESSION_SECRET` and `TOKEN_ISSUER_KEY` are preset; `vars` are applied
    /// on top (an empty value unsets).
    pub fn try_with_env(vars: &[(&str, &str)]) -> anyhow::Result<Self> {
        let mut env: HashMap<String, String> = HashMap::from([
            ("SESSION_SECRET".to_string(), TEST_SECRET.to_string()),
            ("TOKEN_ISSUER_KEY".to_string(), TEST_ISSUER_KEY.to_string()),
        ]);
        for (key, value) in vars {
            env.insert(key.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|key| env.get(key).cloned())?;
        let state = app::build_state(&config)?;
        let header = state.rbac.token_header_name().to_string();
        let router = app::build_router(state, &config)?;

        Ok(Self {
            router,
            header,
            config,
        })
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_header(method, path, body, token.map(|t| (self.header.as_str(), t)))
            .await
    }

    /// Like [`TestApp::request`] but the credential goes into an arbitrary header.
    pub async fn request_with_header(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        credential: Option<(&str, &str)>,
    ) -> TestResponse {
        let headers: Vec<(&str, &str)> = credential.into_iter().collect();
        self.request_with_headers(method, path, body, &headers).await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `POST /api/v1/token`, presenting `issuer_key` when given.
    pub async fn post_token(&self, body: Value, issuer_key: Option<&str>) -> TestResponse {
        let headers: Vec<(&str, &str)> = issuer_key
            .map(|key| (ISSUER_KEY_HEADER, key))
            .into_iter()
            .collect();
        self.request_with_headers("POST", "/api/v1/token", Some(body), &headers)
            .await
    }

    /// Issues a token through `POST /api/v1/token` with the test issuer key.
    pub async fn issue_token(&self, role: &str, payload: Value) -> String {
        let response = self
            .post_token(
                json!({ "role": role, "payload": payload }),
                Some(TEST_ISSUER_KEY),
            )
            .await;

        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["token"]
            .as_str()
            .expect("token missing from response")
            .to_string()
    }

    /// A token for `role` that passes the demo verificator.
    pub async fn login(&self, role: &str, username: &str) -> String {
        self.issue_token(role, json!({ "username": username })).await
    }
}
