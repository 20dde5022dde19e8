use std::{fmt, sync::Arc};

use parking_lot::RwLock;

use crate::error::AppError;

/// Produces the value used as a rejection reason.
pub type Hook = Arc<dyn Fn() -> AppError + Send + Sync>;

/// The three single-slot rejection hooks.
///
/// Setting a hook replaces the previous one; nothing stacks.
#[derive(Clone)]
pub struct Hooks {
    pub(crate) access_denied: Hook,
    pub(crate) session_rejected: Hook,
    pub(crate) role_unregistered: Hook,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            access_denied: Arc::new(|| AppError::Forbidden),
            session_rejected: Arc::new(|| AppError::Forbidden),
            role_unregistered: Arc::new(|| AppError::RoleNotPresent),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

impl Hooks {
    pub fn access_denied(&self) -> AppError {
        (self.access_denied)()
    }

    pub fn session_rejected(&self) -> AppError {
        (self.session_rejected)()
    }

    pub fn role_unregistered(&self) -> AppError {
        (self.role_unregistered)()
    }
}

/// Calls the hook chosen by `pick` with the lock already released, so a hook
/// may reconfigure the `Rbac` it belongs to.
pub(crate) fn call(hooks: &RwLock<Hooks>, pick: impl FnOnce(&Hooks) -> &Hook) -> AppError {
    let hook = pick(&hooks.read()).clone();
    hook()
}
