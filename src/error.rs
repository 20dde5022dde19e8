/*
 * Responsibility
 * - AppError: the value produced by the rejection hooks (what the host renders)
 * - RbacError: everything the rbac layer can fail with (configuration, rejection, codec)
 * - IntoResponse for both (HTTP status / JSON error body)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::codec::CodecError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("role has not been presented in system")]
    RoleNotPresent,
    #[error("{code}: {message}")]
    Custom {
        status: StatusCode,
        code: String,
        message: String,
    },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn custom(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Custom {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RoleNotPresent | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Custom { status, .. } => *status,
        }
    }

    fn code(&self) -> String {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED".into(),
            AppError::Forbidden => "FORBIDDEN".into(),
            AppError::RoleNotPresent => "ROLE_NOT_PRESENT".into(),
            AppError::Custom { code, .. } => code.clone(),
            AppError::Internal => "INTERNAL".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Custom { message, .. } => message.clone(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Failures of the rbac layer.
///
/// `SessionRejected`, `AccessDenied` and `UnregisteredRole` carry the value
/// produced by the matching hook; that value is what reaches the client.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("invalid rbac configuration: {0}")]
    Config(String),

    #[error("session rejected: {0}")]
    SessionRejected(AppError),

    #[error("access denied: {0}")]
    AccessDenied(AppError),

    #[error("unregistered role: {0}")]
    UnregisteredRole(AppError),

    #[error("token payload must be a JSON object")]
    InvalidPayload,

    #[error("session wrapper failed")]
    WrapperFailed(#[source] anyhow::Error),

    #[error("credential codec failure: {0}")]
    Codec(#[from] CodecError),
}

impl RbacError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl IntoResponse for RbacError {
    fn into_response(self) -> Response {
        match self {
            RbacError::SessionRejected(value)
            | RbacError::AccessDenied(value)
            | RbacError::UnregisteredRole(value) => value.into_response(),
            RbacError::InvalidPayload => AppError::custom(
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                "token payload must be a JSON object",
            )
            .into_response(),
            other => {
                tracing::error!(error = %other, "rbac failure");
                AppError::Internal.into_response()
            }
        }
    }
}
