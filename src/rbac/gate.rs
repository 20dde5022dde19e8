use std::{collections::HashSet, sync::Arc};

use parking_lot::RwLock;

use crate::error::AppError;
use crate::rbac::{Hooks, Session, hooks};

/// Which roles a gate lets through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    /// Every role registered at the time the gate is built.
    Authorized,
    Roles(Vec<String>),
}

impl AllowList {
    pub fn authorized() -> Self {
        Self::Authorized
    }
}

impl From<Vec<String>> for AllowList {
    fn from(roles: Vec<String>) -> Self {
        Self::Roles(roles)
    }
}

impl From<&[&str]> for AllowList {
    fn from(roles: &[&str]) -> Self {
        Self::Roles(roles.iter().map(|r| r.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for AllowList {
    fn from(roles: [&str; N]) -> Self {
        Self::Roles(roles.iter().map(|r| r.to_string()).collect())
    }
}

/// Outcome of a gate for one request.
///
/// `Skip` is not an error: the host should try the next route registered for
/// the same path.
#[derive(Debug)]
pub enum Decision {
    Continue,
    Skip,
    Reject(AppError),
}

/// Per-route role check.
///
/// The allowed set is resolved once, when the gate is built. The denial hook
/// is looked up on every rejection.
#[derive(Clone)]
pub struct Gate {
    allowed: Arc<HashSet<String>>,
    soft_fail: bool,
    hooks: Arc<RwLock<Hooks>>,
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("allowed", &self.allowed)
            .field("soft_fail", &self.soft_fail)
            .finish()
    }
}

impl Gate {
    pub(crate) fn new(allowed: HashSet<String>, soft_fail: bool, hooks: Arc<RwLock<Hooks>>) -> Self {
        Self {
            allowed: Arc::new(allowed),
            soft_fail,
            hooks,
        }
    }

    pub fn allows(&self, role: &str) -> bool {
        self.allowed.contains(role)
    }

    pub fn soft_fail(&self) -> bool {
        self.soft_fail
    }

    pub fn decide(&self, session: Option<&Session>) -> Decision {
        let role = session.map(Session::role);
        if role.is_some_and(|r| self.allows(r)) {
            return Decision::Continue;
        }

        if self.soft_fail {
            tracing::debug!(role = ?role, "access gate skipped route");
            Decision::Skip
        } else {
            tracing::debug!(role = ?role, "access gate denied request");
            Decision::Reject(hooks::call(&self.hooks, |h| &h.access_denied))
        }
    }
}
