/*
 * Responsibility
 * - services の公開インターフェース
 * - codec: credential sign/verify (the only external collaborator of rbac)
 */
pub mod codec;

pub use codec::{CodecError, CredentialCodec, JwtCodec};
