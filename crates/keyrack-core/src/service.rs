//! Project-scoped key operations: listing with search and pagination,
//! single-record reads gated by the whitelist, and writes through the
//! encryption gateway.

use std::sync::Arc;

use keyrack_crypto::Cipher;
use keyrack_storage::{
    BlobStore, CreateKeyParams, FieldSelector, IdentityId, KeyFilter, KeyId, KeyKind, KeyPatch,
    KeyRecord, KeyStore, ProjectId, SortSpec, StoreError, TagName,
};
use zeroize::Zeroizing;

use crate::authz::{is_authorized, Capability, Directory};
use crate::error::ServiceError;
use crate::page::{Page, Paginator};
use crate::views::KeyView;

/// A project-scoped listing request.
#[derive(Clone, Debug)]
pub struct ListRequest {
    /// Free-text search term. A leading `#` searches by tag name (up to the
    /// first comma); otherwise the term is matched against `selector`.
    pub query: Option<String>,
    /// Which field a non-hashtag query targets. Defaults to the key name.
    pub selector: FieldSelector,
    pub sort: SortSpec,
    /// 1-based page number.
    pub page: usize,
    /// Overrides the service's configured page size when set.
    pub page_size: Option<usize>,
}

impl Default for ListRequest {
    fn default() -> Self {
        Self {
            query: None,
            selector: FieldSelector::Name,
            sort: SortSpec::default(),
            page: 1,
            page_size: None,
        }
    }
}

/// Input for creating a key. `body` is plaintext; the service encrypts it
/// before it reaches storage. `file` carries raw upload bytes destined for
/// the blob store.
#[derive(Clone, Debug)]
pub struct NewKey {
    pub name: String,
    pub kind: KeyKind,
    pub login: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    pub body: Vec<u8>,
    pub file: Option<Vec<u8>>,
    /// Comma-delimited tag names, resolved find-or-create.
    pub tags: Option<String>,
    pub whitelist: String,
}

/// Field-level update. `None` leaves the stored value alone. `body` is
/// plaintext, `file` raw upload bytes, `tags` a full replacement CSV.
/// `whitelist` is applied only when the caller holds
/// [`Capability::ManageWhitelist`] and is silently dropped otherwise.
#[derive(Clone, Debug, Default)]
pub struct KeyUpdate {
    pub name: Option<String>,
    pub kind: Option<KeyKind>,
    pub login: Option<Option<String>>,
    pub url: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub body: Option<Vec<u8>>,
    pub file: Option<Vec<u8>>,
    pub tags: Option<String>,
    pub whitelist: Option<Vec<String>>,
}

pub struct KeyService {
    pub(crate) store: Arc<dyn KeyStore>,
    pub(crate) directory: Arc<dyn Directory>,
    pub(crate) cipher: Arc<dyn Cipher>,
    pub(crate) blobs: Arc<dyn BlobStore>,
    paginator: Paginator,
}

impl KeyService {
    pub fn new(
        store: Arc<dyn KeyStore>,
        directory: Arc<dyn Directory>,
        cipher: Arc<dyn Cipher>,
        blobs: Arc<dyn BlobStore>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            directory,
            cipher,
            blobs,
            paginator: Paginator::new(page_size),
        }
    }

    // ──────────────────────────────────── Reads ───────────────────────────────────────────

    /// List keys visible to `identity` in `project`.
    ///
    /// Authorization filtering happens on the full sorted result before
    /// pagination so page boundaries stay stable; only the returned page's
    /// bodies are decrypted.
    pub async fn list_keys(
        &self,
        project: &ProjectId,
        identity: &IdentityId,
        request: &ListRequest,
    ) -> Result<Page<KeyView>, ServiceError> {
        let paginator = match request.page_size {
            Some(size) => Paginator::new(size),
            None => self.paginator,
        };

        let filter = match self.resolve_filter(request).await? {
            Some(filter) => filter,
            // Unknown tag: nothing can match, skip the store round-trip.
            None => return Ok(paginator.paginate(Vec::new(), request.page)),
        };

        let listed = self
            .store
            .list_keys(project, &filter, &request.sort)
            .await?;

        let mut visible = Vec::with_capacity(listed.len());
        for record in listed {
            if is_authorized(self.directory.as_ref(), identity, project, &record).await {
                visible.push(record);
            }
        }

        let page = paginator.paginate(visible, request.page);
        let mut items = Vec::with_capacity(page.items.len());
        for record in page.items {
            let body = self.decrypt_body(&record)?;
            items.push(KeyView::from_record(record, body));
        }
        Ok(Page {
            items,
            page: page.page,
            page_size: page.page_size,
            total: page.total,
        })
    }

    /// Fetch a single key. Ids belonging to another project resolve to
    /// `NotFound`; a whitelist miss is `NotWhitelisted` with no data.
    pub async fn get_key(
        &self,
        project: &ProjectId,
        identity: &IdentityId,
        id: &KeyId,
    ) -> Result<KeyView, ServiceError> {
        let record = self.fetch_scoped(project, id).await?;
        if !is_authorized(self.directory.as_ref(), identity, project, &record).await {
            return Err(ServiceError::NotWhitelisted);
        }
        let body = self.decrypt_body(&record)?;
        Ok(KeyView::from_record(record, body))
    }

    // ──────────────────────────────────── Writes ──────────────────────────────────────────

    pub async fn create_key(
        &self,
        project: &ProjectId,
        new: NewKey,
    ) -> Result<KeyRecord, ServiceError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "must not be empty"));
        }
        match new.kind {
            KeyKind::Password if new.body.is_empty() => {
                return Err(ServiceError::validation("body", "must not be empty"));
            }
            KeyKind::File if new.file.is_none() => {
                return Err(ServiceError::validation("file", "upload required"));
            }
            _ => {}
        }

        let file = match &new.file {
            Some(bytes) => Some(self.blobs.put(bytes).await?),
            None => None,
        };
        let body = self.cipher.encrypt(&new.body)?;

        let record = self
            .store
            .create_key(&CreateKeyParams {
                project_id: *project,
                name: name.to_string(),
                kind: new.kind,
                login: new.login,
                url: new.url,
                comment: new.comment,
                body,
                file,
                whitelist: new.whitelist,
            })
            .await?;

        if let Some(csv) = &new.tags {
            self.replace_tags(&record.id, csv).await?;
        }
        Ok(record)
    }

    pub async fn update_key(
        &self,
        project: &ProjectId,
        identity: &IdentityId,
        id: &KeyId,
        update: KeyUpdate,
    ) -> Result<KeyRecord, ServiceError> {
        let current = self.fetch_scoped(project, id).await?;
        if !is_authorized(self.directory.as_ref(), identity, project, &current).await {
            return Err(ServiceError::NotWhitelisted);
        }

        let name = match update.name {
            Some(name) => {
                let trimmed = name.trim().to_string();
                if trimmed.is_empty() {
                    return Err(ServiceError::validation("name", "must not be empty"));
                }
                Some(trimmed)
            }
            None => None,
        };

        let body = match &update.body {
            Some(plaintext) => Some(self.cipher.encrypt(plaintext)?),
            None => None,
        };
        let file = match &update.file {
            Some(bytes) => Some(Some(self.blobs.put(bytes).await?)),
            None => None,
        };

        // Whitelist edits require an explicit capability; without it the
        // submitted tokens are dropped, not rejected.
        let whitelist = match update.whitelist {
            Some(tokens)
                if self
                    .directory
                    .allowed_to(identity, project, Capability::ManageWhitelist)
                    .await =>
            {
                Some(tokens.join(","))
            }
            _ => None,
        };

        let updated = self
            .store
            .update_key(
                id,
                &KeyPatch {
                    project_id: None,
                    name,
                    kind: update.kind,
                    login: update.login,
                    url: update.url,
                    comment: update.comment,
                    body,
                    file,
                    whitelist,
                },
            )
            .await?;

        if let Some(csv) = &update.tags {
            self.replace_tags(id, csv).await?;
        }
        Ok(updated)
    }

    /// Delete a key. Destruction is final and removes tag associations.
    pub async fn delete_key(&self, project: &ProjectId, id: &KeyId) -> Result<(), ServiceError> {
        self.fetch_scoped(project, id).await?;
        self.store.delete_key(id).await?;
        Ok(())
    }

    // ──────────────────────────────────── Helpers ─────────────────────────────────────────

    async fn fetch_scoped(
        &self,
        project: &ProjectId,
        id: &KeyId,
    ) -> Result<KeyRecord, ServiceError> {
        let record = match self.store.get_key(id).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Err(ServiceError::NotFound),
            Err(e) => return Err(e.into()),
        };
        if record.project_id != *project {
            return Err(ServiceError::NotFound);
        }
        Ok(record)
    }

    pub(crate) fn decrypt_body(
        &self,
        record: &KeyRecord,
    ) -> Result<Zeroizing<Vec<u8>>, ServiceError> {
        self.cipher
            .decrypt(&record.body)
            .map_err(|_| ServiceError::Decryption { key_id: record.id })
    }

    /// Turn a request into a store filter. `Ok(None)` means the query named a
    /// tag that does not exist, so the listing is empty by construction.
    async fn resolve_filter(
        &self,
        request: &ListRequest,
    ) -> Result<Option<KeyFilter>, ServiceError> {
        let query = match request.query.as_deref().map(str::trim) {
            None | Some("") => return Ok(Some(KeyFilter::All)),
            Some(query) => query,
        };

        if let Some(tag_name) = parse_hashtag(query) {
            return self.tag_filter(tag_name).await;
        }

        Ok(Some(match request.selector {
            FieldSelector::Name => KeyFilter::Name(query.to_string()),
            FieldSelector::Url => KeyFilter::Url(query.to_string()),
            FieldSelector::Tag => return self.tag_filter(query).await,
        }))
    }

    async fn tag_filter(&self, name: &str) -> Result<Option<KeyFilter>, ServiceError> {
        let tag = self
            .store
            .find_tag_by_name(&TagName(name.to_string()))
            .await?;
        Ok(tag.map(|tag| KeyFilter::Tag(tag.id)))
    }

    pub(crate) async fn replace_tags(
        &self,
        key_id: &KeyId,
        csv: &str,
    ) -> Result<(), ServiceError> {
        let mut tag_ids = Vec::new();
        for name in split_tag_names(csv) {
            let tag = self.store.find_or_create_tag(&name).await?;
            tag_ids.push(tag.id);
        }
        self.store.set_key_tags(key_id, &tag_ids).await?;
        Ok(())
    }
}

/// `#ops, extra` searches the tag `ops`: a leading hash, then everything up
/// to the first comma, trimmed.
fn parse_hashtag(query: &str) -> Option<&str> {
    let rest = query.strip_prefix('#')?;
    let name = rest.split(',').next().unwrap_or(rest).trim();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Split a tag CSV into distinct trimmed names, first occurrence wins.
fn split_tag_names(csv: &str) -> Vec<TagName> {
    let mut names: Vec<TagName> = Vec::new();
    for raw in csv.split(',') {
        let name = raw.trim();
        if name.is_empty() || names.iter().any(|t| t.0 == name) {
            continue;
        }
        names.push(TagName(name.to_string()));
    }
    names
}
