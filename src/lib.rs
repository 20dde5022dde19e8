//! Role-based access control for axum.
//!
//! A bearer credential (default header `X-Auth-Token`) is decoded into a
//! [`rbac::Session`], run through the verification and wrapper chains, and
//! attached to the request. Routes are then gated by role with
//! [`rbac::Rbac::allow`].

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rbac;
pub mod services;
pub mod state;

pub use error::{AppError, RbacError};
pub use rbac::{AllowList, Decision, Gate, Rbac, RbacOptions, Session};
pub use services::codec::{CredentialCodec, JwtCodec};
