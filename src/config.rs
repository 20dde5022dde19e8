/*
 * Responsibility
 * - 環境変数や設定の読み込み (SESSION_SECRET, roles, header name など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Upper bound for `SESSION_TTL_SECONDS` (ten years).
pub const MAX_SESSION_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub session_secret: String,
    pub session_ttl_seconds: Option<u64>,
    pub token_header_name: Option<String>,
    pub roles: Vec<String>,
    /// Shared key a caller must present to `POST /api/v1/token`.
    /// Unset disables the endpoint; tokens then come from `token-gen`.
    pub token_issuer_key: Option<String>,

    pub request_timeout_seconds: u64,
    pub request_body_limit_bytes: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("token_header_name", &self.token_header_name)
            .field("roles", &self.roles)
            .field("token_issuer_key", &self.token_issuer_key.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("request_body_limit_bytes", &self.request_body_limit_bytes)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = match lookup("PORT") {
            Some(s) => s.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 3000,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV"));

        // The process refuses to start without a signing secret.
        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        let session_ttl_seconds = match lookup("SESSION_TTL_SECONDS") {
            Some(s) => Some(
                s.parse::<u64>()
                    .ok()
                    .filter(|ttl| (1..=MAX_SESSION_TTL_SECONDS).contains(ttl))
                    .ok_or(ConfigError::Invalid("SESSION_TTL_SECONDS"))?,
            ),
            None => None,
        };

        let token_header_name = lookup("TOKEN_HEADER_NAME")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let roles = lookup("RBAC_ROLES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let token_issuer_key = lookup("TOKEN_ISSUER_KEY").filter(|s| !s.is_empty());

        let request_timeout_seconds = lookup("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let request_body_limit_bytes = match lookup("REQUEST_BODY_LIMIT_BYTES") {
            Some(s) => s
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or(ConfigError::Invalid("REQUEST_BODY_LIMIT_BYTES"))?,
            None => DEFAULT_BODY_LIMIT_BYTES,
        };

        Ok(Self {
            addr,
            app_env,
            session_secret,
            session_ttl_seconds,
            token_header_name,
            roles,
            token_issuer_key,
            request_timeout_seconds,
            request_body_limit_bytes,
        })
    }
}
