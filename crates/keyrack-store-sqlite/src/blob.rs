//! Filesystem blob store for uploaded key files.

use std::path::PathBuf;

use keyrack_storage::{BlobStore, StoreError};
use uuid::Uuid;

/// Writes each blob to `<dir>/<uuid>` and hands back the generated name as
/// the opaque reference. Contents are never read back by this crate.
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(Self { dir })
    }
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let name = Uuid::new_v4().to_string();
        std::fs::write(self.dir.join(&name), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(name)
    }
}
