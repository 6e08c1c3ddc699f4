use keyrack_storage::{KeyId, StoreError};
use thiserror::Error;

/// Errors surfaced by the key service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The key does not exist, or exists in a different project. Cross-project
    /// lookups map here so an id can never confirm existence elsewhere.
    #[error("key not found")]
    NotFound,

    /// The identity is not on the key's whitelist. Only single-record
    /// operations return this; listings silently filter instead.
    #[error("not whitelisted for this key")]
    NotWhitelisted,

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// The stored body could not be decrypted under the configured cipher.
    #[error("cannot decrypt body of key {key_id}")]
    Decryption { key_id: KeyId },

    #[error(transparent)]
    Encryption(#[from] keyrack_crypto::EncryptError),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ServiceError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
