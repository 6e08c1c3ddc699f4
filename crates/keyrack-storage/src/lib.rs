//! Storage abstraction for keyrack.
//!
//! Backend crates (e.g., keyrack-store-sqlite) implement the [`KeyStore`] trait
//! so keyrack-core doesn't depend on any specific database engine or schema
//! details. Secret bodies are persisted in whatever form the encryption
//! gateway produced; this crate never sees plaintext.

use thiserror::Error;

mod blob;
mod store;
mod types;

pub use blob::BlobStore;
pub use store::KeyStore;
pub use types::*;

#[cfg(feature = "test-support")]
pub use blob::MockBlobStore;
#[cfg(feature = "test-support")]
pub use store::MockKeyStore;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
