//! Bulk CSV import of legacy-exported keys.
//!
//! Each row arrives with its body encrypted under the legacy export cipher.
//! Rows are re-encrypted under the service's primary cipher and upserted by
//! name: an unknown name creates a record and then forces the row's id onto
//! it so cross-system references keep working; a known name is updated in
//! place. One bad row never stops the batch.

use std::io::Read;

use keyrack_crypto::Cipher;
use keyrack_storage::{CreateKeyParams, KeyId, KeyKind, KeyPatch, ProjectId};
use serde::Deserialize;
use thiserror::Error;

use crate::error::ServiceError;
use crate::service::KeyService;

/// One exported record. Header names match the legacy export format;
/// `comment` doubles as the initial whitelist of the created key.
#[derive(Clone, Debug, Deserialize)]
pub struct ImportRow {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// Legacy-encrypted body (base64 text).
    pub body: String,
    #[serde(default)]
    pub login: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug)]
pub struct ImportFailure {
    /// 1-based data row number (the header row is not counted).
    pub row: u64,
    /// Row name when the record decoded far enough to have one.
    pub name: Option<String>,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: Vec<ImportFailure>,
}

#[derive(Debug, Error)]
enum RowError {
    #[error("invalid {0}: {1}")]
    Field(&'static str, String),
    #[error("cannot decrypt legacy body")]
    Decrypt,
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl KeyService {
    /// Import a CSV export (with headers). Decode and processing failures are
    /// reported per row; the batch always runs to completion and is not
    /// transactional across rows.
    pub async fn import_csv(
        &self,
        legacy: &dyn Cipher,
        reader: impl Read,
    ) -> Result<ImportReport, ServiceError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut report = ImportReport::default();

        for (index, decoded) in csv_reader.deserialize::<ImportRow>().enumerate() {
            let row_number = index as u64 + 1;
            match decoded {
                Ok(row) => self.import_one(legacy, row_number, &row, &mut report).await,
                Err(e) => {
                    tracing::error!(row = row_number, error = %e, "import: undecodable row");
                    report.failed.push(ImportFailure {
                        row: row_number,
                        name: None,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Import already-decoded rows. Same per-row fault isolation as
    /// [`import_csv`](Self::import_csv).
    pub async fn import_rows(&self, legacy: &dyn Cipher, rows: &[ImportRow]) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, row) in rows.iter().enumerate() {
            self.import_one(legacy, index as u64 + 1, row, &mut report)
                .await;
        }
        report
    }

    async fn import_one(
        &self,
        legacy: &dyn Cipher,
        row_number: u64,
        row: &ImportRow,
        report: &mut ImportReport,
    ) {
        match self.import_row(legacy, row).await {
            Ok(()) => report.succeeded += 1,
            Err(e) => {
                tracing::error!(row = row_number, name = %row.name, error = %e, "import: row failed");
                report.failed.push(ImportFailure {
                    row: row_number,
                    name: Some(row.name.clone()),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn import_row(&self, legacy: &dyn Cipher, row: &ImportRow) -> Result<(), RowError> {
        let id: KeyId = row
            .id
            .parse()
            .map_err(|e: uuid::Error| RowError::Field("id", e.to_string()))?;
        let project_id: ProjectId = row
            .project_id
            .parse()
            .map_err(|e: uuid::Error| RowError::Field("project_id", e.to_string()))?;
        let kind: KeyKind = row
            .kind
            .parse()
            .map_err(|e| RowError::Field("kind", format!("{e}")))?;
        let name = row.name.trim();
        if name.is_empty() {
            return Err(RowError::Field("name", "must not be empty".into()));
        }

        let plaintext = legacy
            .decrypt(row.body.as_bytes())
            .map_err(|_| RowError::Decrypt)?;
        let body = self
            .cipher
            .encrypt(&plaintext)
            .map_err(ServiceError::from)?;
        let whitelist = row.comment.clone().unwrap_or_default();

        let existing = self
            .store
            .find_key_by_name(name)
            .await
            .map_err(ServiceError::from)?;

        match existing {
            None => {
                let created = self
                    .store
                    .create_key(&CreateKeyParams {
                        project_id,
                        name: name.to_string(),
                        kind,
                        login: row.login.clone(),
                        url: row.url.clone(),
                        comment: row.comment.clone(),
                        body,
                        file: row.file.clone(),
                        whitelist,
                    })
                    .await
                    .map_err(ServiceError::from)?;
                self.store
                    .override_key_id(&created.id, &id)
                    .await
                    .map_err(ServiceError::from)?;
            }
            Some(current) => {
                // the export row wins, including which project owns the key
                self.store
                    .update_key(
                        &current.id,
                        &KeyPatch {
                            project_id: Some(project_id),
                            name: None,
                            kind: Some(kind),
                            login: Some(row.login.clone()),
                            url: Some(row.url.clone()),
                            comment: Some(row.comment.clone()),
                            body: Some(body),
                            file: Some(row.file.clone()),
                            whitelist: Some(whitelist),
                        },
                    )
                    .await
                    .map_err(ServiceError::from)?;
            }
        }
        Ok(())
    }
}
