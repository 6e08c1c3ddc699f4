//! Read views handed back by the service.

use chrono::{DateTime, Utc};
use keyrack_storage::{KeyId, KeyKind, KeyRecord, ProjectId};
use zeroize::Zeroizing;

/// Transient plaintext body. Masked in `Debug`/`Display` so it cannot leak
/// through logs or error formatting; zeroized on drop.
pub struct DecryptedBody(Zeroizing<Vec<u8>>);

impl DecryptedBody {
    pub(crate) fn new(plaintext: Zeroizing<Vec<u8>>) -> Self {
        Self(plaintext)
    }

    /// The plaintext bytes. Callers must not persist or log them.
    pub fn reveal(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for DecryptedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for DecryptedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

/// A key as presented to the host, with the body decrypted for this read
/// only. The stored record is untouched.
pub struct KeyView {
    pub id: KeyId,
    pub project_id: ProjectId,
    pub name: String,
    pub kind: KeyKind,
    pub login: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    pub body: DecryptedBody,
    pub file: Option<String>,
    pub whitelist: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl KeyView {
    pub(crate) fn from_record(record: KeyRecord, body: Zeroizing<Vec<u8>>) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            name: record.name,
            kind: record.kind,
            login: record.login,
            url: record.url,
            comment: record.comment,
            body: DecryptedBody::new(body),
            file: record.file,
            whitelist: record.whitelist,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
