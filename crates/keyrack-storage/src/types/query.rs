//! Listing filter and sort types.

use super::TagId;

/// Which field an explicit search selector targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldSelector {
    Name,
    Url,
    Tag,
}

/// Filter applied to a project-scoped listing. Variants are mutually
/// exclusive; tag filters carry an already-resolved tag id (an unknown tag
/// name never reaches the store — the caller short-circuits to an empty
/// result).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyFilter {
    /// All keys in the project.
    All,
    /// Exact match on the key name.
    Name(String),
    /// Exact match on the key url.
    Url(String),
    /// Keys associated with the given tag.
    Tag(TagId),
}

/// Sortable columns for key listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortField {
    Name,
    Login,
    Url,
    CreatedAt,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification. Ties are always broken by id ascending so pagination
/// stays deterministic across pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            direction: SortDirection::Asc,
        }
    }
}
