//! The KeyStore trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait keyrack-core depends on.
///
/// All listing methods are **scoped by project**; a backend must never let a
/// query observe another project's keys.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait KeyStore: Send + Sync {
    // ───────────────────────────────────── Keys ───────────────────────────────────────────

    /// Create a new key with a generated identifier.
    async fn create_key(&self, params: &CreateKeyParams) -> Result<KeyRecord, StoreError>;

    /// Get a key by ID (unscoped; callers enforce project scoping).
    async fn get_key(&self, key_id: &KeyId) -> Result<KeyRecord, StoreError>;

    /// Find a key by display name anywhere in the store. Used by the bulk
    /// importer to match incoming rows against existing records; returns the
    /// first match when names collide.
    async fn find_key_by_name(&self, name: &str) -> Result<Option<KeyRecord>, StoreError>;

    /// Apply a field-level patch to an existing key.
    async fn update_key(&self, key_id: &KeyId, patch: &KeyPatch) -> Result<KeyRecord, StoreError>;

    /// Delete a key. Destruction is final and cascades tag associations.
    async fn delete_key(&self, key_id: &KeyId) -> Result<(), StoreError>;

    /// Rewrite a key's identifier in a single atomic update. Used by the bulk
    /// importer to preserve cross-system references; a concurrent reader sees
    /// either the old or the new id, never a placeholder.
    async fn override_key_id(&self, key_id: &KeyId, new_id: &KeyId) -> Result<(), StoreError>;

    /// List keys in a project, filtered and sorted. Ties are broken by id
    /// ascending regardless of `sort`.
    async fn list_keys(
        &self,
        project_id: &ProjectId,
        filter: &KeyFilter,
        sort: &SortSpec,
    ) -> Result<Vec<KeyRecord>, StoreError>;

    // ───────────────────────────────────── Tags ───────────────────────────────────────────

    /// Find a tag by exact name, or create it. Two concurrent calls for the
    /// same name must converge on a single tag (uniqueness constraint on the
    /// name column).
    async fn find_or_create_tag(&self, name: &TagName) -> Result<Tag, StoreError>;

    /// Exact-name tag lookup.
    async fn find_tag_by_name(&self, name: &TagName) -> Result<Option<Tag>, StoreError>;

    /// Replace a key's tag associations with the given set. The replacement
    /// is transactional: no reader observes the key with zero tags mid-way.
    async fn set_key_tags(&self, key_id: &KeyId, tag_ids: &[TagId]) -> Result<(), StoreError>;

    /// List the tags associated with a key.
    async fn list_key_tags(&self, key_id: &KeyId) -> Result<Vec<Tag>, StoreError>;
}
