/*
 * Responsibility
 * - Config読み込み → Rbac 構築 → Router 組み立て
 * - Middleware の適用 (session / http)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::Result;
use axum::{Router, http::StatusCode, routing::get};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::middleware::http::HttpLimits;
use crate::rbac::{Rbac, RbacOptions, Session, verificator_fn, wrapper_fn};
use crate::services::codec::JwtCodec;
use crate::state::AppState;

/// Roles registered when `RBAC_ROLES` is not set.
pub const DEMO_ROLES: [&str; 2] = ["admin", "user"];

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,route_rbac=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting rbac demo in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config)?;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the rbac configuration for the demo host.
///
/// - verificator: the session must carry a non-empty `username`
/// - wrapper: stamps `verified_at` on every derived session
pub fn build_state(config: &Config) -> Result<AppState> {
    let codec = JwtCodec::from_secret(config.session_secret.as_bytes(), config.session_ttl_seconds)?;

    let roles = if config.roles.is_empty() {
        DEMO_ROLES.iter().map(|r| r.to_string()).collect()
    } else {
        config.roles.clone()
    };

    let rbac = Rbac::with_options(
        codec,
        RbacOptions {
            token_header_name: config.token_header_name.clone(),
            roles: Some(roles),
            role_unregistered: Some(Arc::new(|| {
                AppError::custom(StatusCode::BAD_REQUEST, "UNKNOWN_ROLE", "user role is not correct")
            })),
            ..Default::default()
        },
    )?;

    rbac.add_verificator(verificator_fn(|session: Session| async move {
        let username = session.get("username").and_then(Value::as_str);
        anyhow::Ok(username.is_some_and(|u| !u.trim().is_empty()))
    }))?;

    rbac.add_wrapper(wrapper_fn(|mut session: Session| async move {
        session.insert("verified_at", chrono::Utc::now().to_rfc3339());
        anyhow::Ok(session)
    }))?;

    tracing::info!(roles = ?rbac.roles(), header = %rbac.token_header_name(), "rbac configured");

    let state = AppState::new(rbac);
    Ok(match config.token_issuer_key.as_deref() {
        Some(key) => state.with_issuer_key(key),
        None => {
            tracing::info!("TOKEN_ISSUER_KEY not set; POST /api/v1/token is disabled, use token-gen");
            state
        }
    })
}

pub fn build_router(state: AppState, config: &Config) -> Result<Router> {
    let rbac = state.rbac.clone();

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone())?)
        .with_state(state);

    let router = middleware::session::apply(router, rbac.clone());

    Ok(middleware::http::apply(
        router,
        rbac,
        HttpLimits {
            body_limit_bytes: config.request_body_limit_bytes,
            timeout: Duration::from_secs(config.request_timeout_seconds),
        },
    ))
}
