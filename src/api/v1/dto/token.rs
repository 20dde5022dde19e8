use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body for `POST /token`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// Must be a registered role.
    pub role: String,

    /// Extra session fields. `role`, `iat` and `exp` keys are ignored.
    #[serde(default)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Header the token has to be sent back in.
    pub header: String,
}
