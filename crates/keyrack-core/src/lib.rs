//! Core key service for keyrack.
//!
//! Ties the storage and crypto seams together: whitelist authorization,
//! project-scoped queries with pagination, the encryption gateway, and the
//! bulk importer. The host application supplies the [`Directory`] (identity
//! and membership lookups) and a [`keyrack_storage::KeyStore`] backend.

mod authz;
mod config;
mod error;
mod import;
mod page;
mod service;
mod views;

pub use authz::{is_authorized, Capability, Directory};
pub use config::{ConfigError, ServiceConfig};
pub use error::ServiceError;
pub use import::{ImportFailure, ImportReport, ImportRow};
pub use page::{Page, Paginator};
pub use service::{KeyService, KeyUpdate, ListRequest, NewKey};
pub use views::{DecryptedBody, KeyView};
