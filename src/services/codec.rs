//! Credential codec: turns a [`Session`] into an opaque signed token and back.
//!
//! The rbac layer only talks to [`CredentialCodec`]; [`JwtCodec`] is the
//! shipped implementation (HS256, shared process secret).

use std::{error::Error as StdError, fmt};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::rbac::Session;

// Errors returned by signing or verifying a credential.
#[derive(Debug)]
pub enum CodecError {
    EmptySecret,
    TtlOutOfRange(u64),
    Jwt(jsonwebtoken::errors::Error),
}

impl CodecError {
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Jwt(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        )
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "session secret must not be empty"),
            Self::TtlOutOfRange(ttl) => write!(f, "session ttl {}s does not fit a timestamp", ttl),
            Self::Jwt(e) => write!(f, "jwt failure: {}", e),
        }
    }
}

impl StdError for CodecError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Sign/verify service behind the session deriver and token issuance.
///
/// `verify` must fail on tampering, malformed input and expiry; the caller
/// decides what a failure means.
pub trait CredentialCodec: Send + Sync {
    fn sign(&self, session: &Session) -> Result<String, CodecError>;

    fn verify(&self, token: &str) -> Result<Session, CodecError>;
}

/// Registered JWT metadata wrapped around the session fields.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    session: Session,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// HS256 codec keyed by `SESSION_SECRET`.
///
/// Key material is not printable via Debug.
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: Option<u64>,
}

impl fmt::Debug for JwtCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCodec")
            .field("validation", &self.validation)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl JwtCodec {
    /// `ttl_seconds = None` issues non-expiring tokens; otherwise `exp` is
    /// stamped on signing and required on verify.
    pub fn from_secret(secret: &[u8], ttl_seconds: Option<u64>) -> Result<Self, CodecError> {
        if secret.is_empty() {
            return Err(CodecError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        if ttl_seconds.is_some() {
            validation.set_required_spec_claims(&["exp"]);
        } else {
            validation.required_spec_claims.clear();
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
        })
    }

    pub fn ttl_seconds(&self) -> Option<u64> {
        self.ttl_seconds
    }
}

impl CredentialCodec for JwtCodec {
    fn sign(&self, session: &Session) -> Result<String, CodecError> {
        let now = chrono::Utc::now().timestamp();
        let exp = match self.ttl_seconds {
            Some(ttl) => Some(
                i64::try_from(ttl)
                    .ok()
                    .and_then(|ttl| now.checked_add(ttl))
                    .ok_or(CodecError::TtlOutOfRange(ttl))?,
            ),
            None => None,
        };
        let claims = SessionClaims {
            session: session.clone(),
            iat: Some(now),
            exp,
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "failed to sign session token");
            CodecError::from(e)
        })
    }

    fn verify(&self, token: &str) -> Result<Session, CodecError> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;

        Ok(data.claims.session)
    }
}
