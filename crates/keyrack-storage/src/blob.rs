//! Blob store seam for uploaded key files.

use crate::StoreError;

/// Accepts raw bytes, returns an opaque stable reference string. The core
/// stores only the reference on the key record and never reads blob contents.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<String, StoreError>;
}
