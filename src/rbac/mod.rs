//! Role-based access control over a bearer credential.
//!
//! [`Rbac`] owns all configuration: the credential header name, the role
//! registry, the verification and wrapper chains and the rejection hooks.
//! Configure it once at startup, then share clones with the session middleware
//! and every [`Gate`] built from it.

mod chain;
mod gate;
mod hooks;
mod roles;
mod session;

use std::{collections::HashSet, sync::Arc};

use axum::http::HeaderName;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, RbacError};
use crate::services::codec::CredentialCodec;

pub use chain::{
    Chain, Verificator, Verify, Wrap, Wrapper, run_verification, run_wrappers, verificator_fn,
    wrapper_fn,
};
pub use gate::{AllowList, Decision, Gate};
pub use hooks::{Hook, Hooks};
pub use roles::RoleRegistry;
pub use session::Session;

pub const DEFAULT_TOKEN_HEADER: &str = "X-Auth-Token";

// JWT metadata owned by the codec; never copied from a caller's payload.
const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// One-shot configuration, applied through the same setters as the individual calls.
#[derive(Default)]
pub struct RbacOptions {
    pub token_header_name: Option<String>,
    pub roles: Option<Vec<String>>,
    pub access_denied: Option<Hook>,
    pub session_rejected: Option<Hook>,
    pub role_unregistered: Option<Hook>,
}

struct Inner {
    codec: Arc<dyn CredentialCodec>,
    header_name: RwLock<HeaderName>,
    roles: RwLock<RoleRegistry>,
    verificators: RwLock<Chain<dyn Verify>>,
    wrappers: RwLock<Chain<dyn Wrap>>,
    hooks: Arc<RwLock<Hooks>>,
}

#[derive(Clone)]
pub struct Rbac {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Rbac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rbac")
            .field("header_name", &*self.inner.header_name.read())
            .field("roles", &*self.inner.roles.read())
            .field("verificators", &self.inner.verificators.read().len())
            .field("wrappers", &self.inner.wrappers.read().len())
            .finish()
    }
}

impl Rbac {
    pub fn new(codec: impl CredentialCodec + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                codec: Arc::new(codec),
                header_name: RwLock::new(HeaderName::from_static("x-auth-token")),
                roles: RwLock::new(RoleRegistry::default()),
                verificators: RwLock::new(Chain::new("verificator")),
                wrappers: RwLock::new(Chain::new("wrapper")),
                hooks: Arc::new(RwLock::new(Hooks::default())),
            }),
        }
    }

    pub fn with_options(
        codec: impl CredentialCodec + 'static,
        options: RbacOptions,
    ) -> Result<Self, RbacError> {
        let rbac = Self::new(codec);

        if let Some(name) = options.token_header_name.as_deref() {
            rbac.set_token_header_name(name)?;
        }
        if let Some(hook) = options.access_denied {
            rbac.inner.hooks.write().access_denied = hook;
        }
        if let Some(hook) = options.session_rejected {
            rbac.inner.hooks.write().session_rejected = hook;
        }
        if let Some(hook) = options.role_unregistered {
            rbac.inner.hooks.write().role_unregistered = hook;
        }
        if let Some(roles) = options.roles {
            rbac.set_roles(roles);
        }

        Ok(rbac)
    }

    pub fn set_token_header_name(&self, name: &str) -> Result<(), RbacError> {
        let header = HeaderName::try_from(name)
            .map_err(|_| RbacError::config(format!("invalid token header name: {name:?}")))?;
        *self.inner.header_name.write() = header;
        Ok(())
    }

    pub fn token_header_name(&self) -> HeaderName {
        self.inner.header_name.read().clone()
    }

    /// Replaces the role registry. Duplicates collapse.
    pub fn set_roles<I, S>(&self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.inner.roles.write() = RoleRegistry::new(roles);
    }

    pub fn roles(&self) -> Vec<String> {
        self.inner.roles.read().iter().map(str::to_owned).collect()
    }

    pub fn is_registered(&self, role: &str) -> bool {
        self.inner.roles.read().is_registered(role)
    }

    pub fn add_verificator(&self, verificator: Verificator) -> Result<(), RbacError> {
        self.inner.verificators.write().register(verificator)
    }

    pub fn add_wrapper(&self, wrapper: Wrapper) -> Result<(), RbacError> {
        self.inner.wrappers.write().register(wrapper)
    }

    pub fn verificator_count(&self) -> usize {
        self.inner.verificators.read().len()
    }

    pub fn wrapper_count(&self) -> usize {
        self.inner.wrappers.read().len()
    }

    pub fn on_access_denied(&self, hook: impl Fn() -> AppError + Send + Sync + 'static) {
        self.inner.hooks.write().access_denied = Arc::new(hook);
    }

    pub fn on_session_rejected(&self, hook: impl Fn() -> AppError + Send + Sync + 'static) {
        self.inner.hooks.write().session_rejected = Arc::new(hook);
    }

    pub fn on_role_unregistered(&self, hook: impl Fn() -> AppError + Send + Sync + 'static) {
        self.inner.hooks.write().role_unregistered = Arc::new(hook);
    }

    /// Signs `{role, ...payload}` for a registered role.
    ///
    /// `payload` must serialize to a JSON object (or `null`). A `role` key in
    /// the payload never overrides `role`.
    pub fn issue_token<T: Serialize>(&self, role: &str, payload: &T) -> Result<String, RbacError> {
        if !self.is_registered(role) {
            tracing::warn!(role, "refusing to issue token for unregistered role");
            return Err(RbacError::UnregisteredRole(hooks::call(
                &self.inner.hooks,
                |h| &h.role_unregistered,
            )));
        }

        let mut data = match serde_json::to_value(payload).map_err(|_| RbacError::InvalidPayload)? {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            _ => return Err(RbacError::InvalidPayload),
        };
        data.remove("role");
        for claim in RESERVED_CLAIMS {
            data.remove(claim);
        }

        let token = self.inner.codec.sign(&Session::with_data(role, data))?;
        Ok(token)
    }

    /// Turns the raw credential header value into the session handlers see.
    ///
    /// - no credential, or one the codec rejects: `Ok(None)` (anonymous)
    /// - verification chain declines: `Err(SessionRejected)`
    /// - otherwise the wrapper chain output
    pub async fn derive_session(
        &self,
        credential: Option<&str>,
    ) -> Result<Option<Session>, RbacError> {
        let Some(token) = credential else {
            return Ok(None);
        };

        let session = match self.inner.codec.verify(token) {
            Ok(session) => session,
            Err(err) => {
                tracing::debug!(error = %err, expired = err.is_expired(), "credential ignored");
                return Ok(None);
            }
        };

        let verificators = self.inner.verificators.read().snapshot();
        if !run_verification(&verificators, &session).await {
            tracing::warn!(role = %session.role, "session rejected by verification chain");
            return Err(RbacError::SessionRejected(hooks::call(
                &self.inner.hooks,
                |h| &h.session_rejected,
            )));
        }

        let wrappers = self.inner.wrappers.read().snapshot();
        let session = run_wrappers(&wrappers, session)
            .await
            .map_err(RbacError::WrapperFailed)?;

        Ok(Some(session))
    }

    /// Builds a gate for `allowed`. Every listed role must already be
    /// registered; `AllowList::Authorized` expands to the current registry.
    pub fn allow(&self, allowed: impl Into<AllowList>, soft_fail: bool) -> Result<Gate, RbacError> {
        let registry = self.inner.roles.read();

        let resolved: HashSet<String> = match allowed.into() {
            AllowList::Authorized => registry.iter().map(str::to_owned).collect(),
            AllowList::Roles(roles) => {
                if let Some(unknown) = roles.iter().find(|r| !registry.is_registered(r)) {
                    return Err(RbacError::config(format!(
                        "role {unknown:?} is not registered"
                    )));
                }
                roles.into_iter().collect()
            }
        };

        Ok(Gate::new(resolved, soft_fail, self.inner.hooks.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::services::codec::JwtCodec;

    fn rbac() -> Rbac {
        let rbac = Rbac::new(JwtCodec::from_secret(b"rbac-test-secret", None).unwrap());
        rbac.set_roles(["admin", "user"]);
        rbac
    }

    #[test]
    fn header_name_defaults_and_validates() {
        let rbac = rbac();
        assert_eq!(rbac.token_header_name().as_str(), "x-auth-token");
        assert!(rbac.token_header_name().as_str().eq_ignore_ascii_case(DEFAULT_TOKEN_HEADER));

        rbac.set_token_header_name("Token").unwrap();
        assert_eq!(rbac.token_header_name().as_str(), "token");

        assert!(matches!(
            rbac.set_token_header_name("not a header"),
            Err(RbacError::Config(_))
        ));
        assert_eq!(rbac.token_header_name().as_str(), "token");
    }

    #[test]
    fn set_roles_replaces_wholesale() {
        let rbac = rbac();
        rbac.set_roles(["editor", "editor"]);

        assert_eq!(rbac.roles(), vec!["editor".to_string()]);
        assert!(!rbac.is_registered("admin"));
    }

    #[tokio::test]
    async fn issued_token_round_trips() {
        let rbac = rbac();
        let token = rbac
            .issue_token("admin", &json!({"user": {"username": "username"}}))
            .unwrap();

        let session = rbac.derive_session(Some(&token)).await.unwrap().unwrap();
        assert_eq!(session.role, "admin");
        assert_eq!(session.get("user"), Some(&json!({"username": "username"})));
        assert_eq!(session.data.len(), 1);
    }

    #[tokio::test]
    async fn payload_cannot_override_role() {
        let rbac = rbac();
        let token = rbac
            .issue_token("user", &json!({"role": "admin", "iat": 1}))
            .unwrap();

        let session = rbac.derive_session(Some(&token)).await.unwrap().unwrap();
        assert_eq!(session.role, "user");
        assert!(session.data.is_empty());
    }

    #[test]
    fn unregistered_role_uses_hook() {
        let rbac = rbac();

        let err = rbac.issue_token("root", &json!({})).unwrap_err();
        assert!(matches!(err, RbacError::UnregisteredRole(AppError::RoleNotPresent)));

        rbac.on_role_unregistered(|| AppError::custom(StatusCode::BAD_REQUEST, "ROLE", "bad role"));
        match rbac.issue_token("root", &json!({})) {
            Err(RbacError::UnregisteredRole(value)) => {
                assert_eq!(value.status(), StatusCode::BAD_REQUEST)
            }
            other => panic!("expected unregistered role, got {other:?}"),
        }
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let rbac = rbac();
        assert!(matches!(
            rbac.issue_token("user", &json!([1, 2])),
            Err(RbacError::InvalidPayload)
        ));
        assert!(rbac.issue_token("user", &()).is_ok());
    }

    #[tokio::test]
    async fn missing_or_garbage_credential_is_anonymous() {
        let rbac = rbac();
        rbac.add_verificator(verificator_fn(|_| async { anyhow::Ok(false) }))
            .unwrap();

        assert!(rbac.derive_session(None).await.unwrap().is_none());
        // an invalid credential never reaches the verification chain
        assert!(rbac.derive_session(Some("garbage")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn declined_session_is_rejected_with_hook_value() {
        let rbac = rbac();
        let token = rbac.issue_token("user", &json!({})).unwrap();
        rbac.add_verificator(verificator_fn(|s: Session| async move {
            anyhow::Ok(s.role == "admin")
        }))
        .unwrap();

        let err = rbac.derive_session(Some(&token)).await.unwrap_err();
        assert!(matches!(err, RbacError::SessionRejected(AppError::Forbidden)));

        rbac.on_session_rejected(|| AppError::Unauthorized);
        let err = rbac.derive_session(Some(&token)).await.unwrap_err();
        assert!(matches!(err, RbacError::SessionRejected(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn hooks_may_reconfigure_the_rbac_they_belong_to() {
        let rbac = rbac();
        let handle = rbac.clone();
        rbac.on_access_denied(move || {
            handle.on_access_denied(|| AppError::Unauthorized);
            AppError::Forbidden
        });

        let gate = rbac.allow(["admin"], false).unwrap();
        assert!(matches!(gate.decide(None), Decision::Reject(AppError::Forbidden)));
        assert!(matches!(gate.decide(None), Decision::Reject(AppError::Unauthorized)));

        let handle = rbac.clone();
        rbac.on_session_rejected(move || {
            handle.set_roles(["admin", "user", "guest"]);
            AppError::Forbidden
        });
        rbac.add_verificator(verificator_fn(|_| async { anyhow::Ok(false) }))
            .unwrap();
        let token = rbac.issue_token("user", &json!({})).unwrap();

        assert!(rbac.derive_session(Some(&token)).await.is_err());
        assert!(rbac.is_registered("guest"));
    }

    #[tokio::test]
    async fn wrappers_only_run_after_verification_passes() {
        let rbac = rbac();
        let wrapped = Arc::new(AtomicUsize::new(0));
        let counter = wrapped.clone();
        rbac.add_wrapper(wrapper_fn(move |mut s: Session| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                s.insert("good_boy", true);
                anyhow::Ok(s)
            }
        }))
        .unwrap();

        let admin = rbac.issue_token("admin", &json!({})).unwrap();
        let session = rbac.derive_session(Some(&admin)).await.unwrap().unwrap();
        assert_eq!(session.get("good_boy"), Some(&json!(true)));

        rbac.add_verificator(verificator_fn(|_| async { anyhow::Ok(false) }))
            .unwrap();
        assert!(rbac.derive_session(Some(&admin)).await.is_err());
        assert_eq!(wrapped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_wrapper_surfaces_as_error() {
        let rbac = rbac();
        rbac.add_wrapper(wrapper_fn(|_| async {
            Err::<Session, _>(anyhow::anyhow!("profile store down"))
        }))
        .unwrap();

        let token = rbac.issue_token("user", &json!({})).unwrap();
        assert!(matches!(
            rbac.derive_session(Some(&token)).await,
            Err(RbacError::WrapperFailed(_))
        ));
    }

    #[test]
    fn duplicate_registration_leaves_chain_length() {
        let rbac = rbac();
        let wrapper = wrapper_fn(|s| async move { anyhow::Ok(s) });

        rbac.add_wrapper(wrapper.clone()).unwrap();
        assert!(matches!(rbac.add_wrapper(wrapper), Err(RbacError::Config(_))));
        assert_eq!(rbac.wrapper_count(), 1);
    }

    #[test]
    fn allow_validates_against_registry() {
        let rbac = rbac();

        assert!(rbac.allow(["admin"], false).is_ok());
        assert!(matches!(
            rbac.allow(["admin", "root"], false),
            Err(RbacError::Config(_))
        ));
    }

    #[test]
    fn authorized_expands_to_registry_at_build_time() {
        let rbac = rbac();
        let gate = rbac.allow(AllowList::authorized(), false).unwrap();

        assert!(gate.allows("admin"));
        assert!(gate.allows("user"));
        assert!(!gate.allows("guest"));

        rbac.set_roles(["guest"]);
        assert!(!gate.allows("guest"));
        assert!(gate.allows("admin"));
    }

    #[test]
    fn options_apply_through_setters() {
        let codec = JwtCodec::from_secret(b"rbac-test-secret", None).unwrap();
        let rbac = Rbac::with_options(
            codec,
            RbacOptions {
                token_header_name: Some("Token".into()),
                roles: Some(vec!["admin".into(), "admin".into()]),
                access_denied: Some(Arc::new(|| AppError::Unauthorized)),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(rbac.token_header_name().as_str(), "token");
        assert_eq!(rbac.roles(), vec!["admin".to_string()]);
        let gate = rbac.allow(["admin"], false).unwrap();
        assert!(matches!(gate.decide(None), Decision::Reject(AppError::Unauthorized)));

        let bad = Rbac::with_options(
            JwtCodec::from_secret(b"rbac-test-secret", None).unwrap(),
            RbacOptions {
                token_header_name: Some("bad header".into()),
                ..Default::default()
            },
        );
        assert!(bad.is_err());
    }
}
