/*!
 * Session extractor
 *
 * Responsibility:
 * - hand the derived Session (inserted by middleware::session) to handlers
 * - HTTP / axum 依存は core に閉じ込める
 *
 * Public API:
 * - CurrentSession
 */

mod core;

pub use self::core::CurrentSession;
