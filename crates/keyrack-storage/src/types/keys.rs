//! Key (secret record) types.

use chrono::{DateTime, Utc};
use std::str::FromStr;

use super::{KeyId, ProjectId};

/// Discriminator for the kind of secret a key holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Login/password style credential.
    Password,
    /// Credential backed by an uploaded file (the blob reference lives in
    /// `KeyRecord::file`).
    File,
}

/// Error type for parsing KeyKind from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyKindError(pub String);

impl std::fmt::Display for ParseKeyKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid key kind: {}", self.0)
    }
}

impl std::error::Error for ParseKeyKindError {}

impl FromStr for KeyKind {
    type Err = ParseKeyKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(KeyKind::Password),
            "file" => Ok(KeyKind::File),
            _ => Err(ParseKeyKindError(s.to_string())),
        }
    }
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Password => "password",
            KeyKind::File => "file",
        }
    }
}

/// Stored key record.
///
/// `body` is whatever the encryption gateway produced (ciphertext or
/// plaintext, depending on the configured strategy); it is decrypted only
/// transiently for display and never rewritten by a read.
#[derive(Clone, Debug)]
pub struct KeyRecord {
    pub id: KeyId,
    pub project_id: ProjectId,
    pub name: String,
    pub kind: KeyKind,
    pub login: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    pub body: Vec<u8>,
    /// Opaque blob-store reference, never the raw upload.
    pub file: Option<String>,
    /// Flat comma-delimited identity/group tokens; empty means no explicit
    /// whitelist.
    pub whitelist: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a key.
#[derive(Clone, Debug)]
pub struct CreateKeyParams {
    pub project_id: ProjectId,
    pub name: String,
    pub kind: KeyKind,
    pub login: Option<String>,
    pub url: Option<String>,
    pub comment: Option<String>,
    pub body: Vec<u8>,
    pub file: Option<String>,
    pub whitelist: String,
}

/// Field-level update set; `None` leaves the stored value untouched.
/// The identifier is not patchable. `project_id` re-homes the key and is set
/// only by the bulk importer; interactive edits never move a key.
#[derive(Clone, Debug, Default)]
pub struct KeyPatch {
    pub project_id: Option<ProjectId>,
    pub name: Option<String>,
    pub kind: Option<KeyKind>,
    pub login: Option<Option<String>>,
    pub url: Option<Option<String>>,
    pub comment: Option<Option<String>>,
    pub body: Option<Vec<u8>>,
    pub file: Option<Option<String>>,
    pub whitelist: Option<String>,
}
