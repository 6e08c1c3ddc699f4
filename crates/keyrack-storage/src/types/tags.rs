//! Tag types. Tags are free-text labels, many-to-many with keys.

use super::{TagId, TagName};

/// Tag record. `name` is unique storage-wide (case-sensitive).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: TagName,
}
