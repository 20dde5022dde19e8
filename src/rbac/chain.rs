//! Verification and wrapper chains.
//!
//! Both are ordered lists of shared handles. Registration order is evaluation
//! order and a handle (by `Arc` identity) can be registered once per chain.

use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::error::RbacError;
use crate::rbac::Session;

/// Decides whether a decoded session is acceptable.
///
/// `Ok(false)` and `Err(_)` both reject the session.
#[async_trait]
pub trait Verify: Send + Sync {
    async fn verify(&self, session: &Session) -> anyhow::Result<bool>;
}

/// Replaces a verified session with the one exposed to handlers.
#[async_trait]
pub trait Wrap: Send + Sync {
    async fn wrap(&self, session: Session) -> anyhow::Result<Session>;
}

pub type Verificator = Arc<dyn Verify>;
pub type Wrapper = Arc<dyn Wrap>;

struct FnVerify<F>(F);

#[async_trait]
impl<F, Fut> Verify for FnVerify<F>
where
    F: Fn(Session) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn verify(&self, session: &Session) -> anyhow::Result<bool> {
        (self.0)(session.clone()).await
    }
}

struct FnWrap<F>(F);

#[async_trait]
impl<F, Fut> Wrap for FnWrap<F>
where
    F: Fn(Session) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Session>> + Send + 'static,
{
    async fn wrap(&self, session: Session) -> anyhow::Result<Session> {
        (self.0)(session).await
    }
}

/// Builds a verificator handle from an async closure.
///
/// ```ignore
/// let only_admins = verificator_fn(|session| async move { anyhow::Ok(session.role == "admin") });
/// rbac.add_verificator(only_admins.clone())?;
/// ```
pub fn verificator_fn<F, Fut>(f: F) -> Verificator
where
    F: Fn(Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnVerify(f))
}

/// Builds a wrapper handle from an async closure.
pub fn wrapper_fn<F, Fut>(f: F) -> Wrapper
where
    F: Fn(Session) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Session>> + Send + 'static,
{
    Arc::new(FnWrap(f))
}

/// Ordered, append-only list of chain handles.
pub struct Chain<T: ?Sized> {
    kind: &'static str,
    entries: Vec<Arc<T>>,
}

impl<T: ?Sized> Chain<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn register(&mut self, entry: Arc<T>) -> Result<(), RbacError> {
        if self.entries.iter().any(|e| Arc::ptr_eq(e, &entry)) {
            return Err(RbacError::config(format!(
                "this {} is already registered",
                self.kind
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clones the handles so the chain can run without holding a lock.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.clone()
    }
}

/// Runs the verificators in order, stopping at the first that does not pass.
/// An empty chain passes.
pub async fn run_verification(verificators: &[Verificator], session: &Session) -> bool {
    for (position, verificator) in verificators.iter().enumerate() {
        match verificator.verify(session).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(position, role = %session.role, "session verificator declined");
                return false;
            }
            Err(err) => {
                tracing::warn!(position, error = ?err, "session verificator failed");
                return false;
            }
        }
    }
    true
}

/// Threads the session through every wrapper in order.
pub async fn run_wrappers(wrappers: &[Wrapper], session: Session) -> anyhow::Result<Session> {
    let mut current = session;
    for wrapper in wrappers {
        current = wrapper.wrap(current).await?;
    }
    Ok(current)
}
