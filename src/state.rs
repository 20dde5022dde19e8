/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - token 発行の鍵 (TOKEN_ISSUER_KEY) の照合
 */
use std::{fmt, sync::Arc};

use subtle::ConstantTimeEq;

use crate::rbac::Rbac;

/// Header carrying `TOKEN_ISSUER_KEY` on `POST /token`.
pub const ISSUER_KEY_HEADER: &str = "x-issuer-key";

#[derive(Clone)]
pub struct AppState {
    pub rbac: Rbac,
    issuer_key: Option<Arc<str>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("rbac", &self.rbac)
            .field("issuance_enabled", &self.issuance_enabled())
            .finish()
    }
}

impl AppState {
    pub fn new(rbac: Rbac) -> Self {
        Self {
            rbac,
            issuer_key: None,
        }
    }

    pub fn with_issuer_key(mut self, key: impl Into<String>) -> Self {
        self.issuer_key = Some(Arc::from(key.into()));
        self
    }

    /// `POST /token` is only mounted when an issuer key is configured.
    pub fn issuance_enabled(&self) -> bool {
        self.issuer_key.is_some()
    }

    pub fn accepts_issuer_key(&self, presented: &str) -> bool {
        match &self.issuer_key {
            Some(key) => bool::from(key.as_bytes().ct_eq(presented.as_bytes())),
            None => false,
        }
    }
}
