/*
 * Responsibility
 * - middleware の公開インターフェース
 * - session: credential → Session (once per request)
 * - gate: per-route role check
 * - fallthrough: several gated registrations for one path
 * - http: request id / tracing / limits
 */
pub mod fallthrough;
pub mod gate;
pub mod http;
pub mod session;

pub use fallthrough::Fallthrough;
pub use gate::RouteSkipped;
