//! Logical sort key resolution.
//!
//! Sort keys exposed to callers are stable logical names. Each listing kind
//! has a fixed table mapping them to physical document paths. Anything not
//! in the table resolves to newest-first.

use serde::{Deserialize, Serialize};

use super::fields::ListingKind;
use super::types::{SortDirection, SortSpec};

/// Field every unmapped sort key falls back to.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Direction of the fallback sort.
pub const DEFAULT_SORT_DIRECTION: SortDirection = SortDirection::Desc;

/// Job feed sort keys: logical → physical.
pub const JOB_SORT_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("company", "company.name"),
    ("location", "location.city"),
    ("salary", "salary.min"),
    ("createdAt", "createdAt"),
    ("views", "analytics.views"),
    ("applications", "analytics.applications"),
];

/// Program catalog sort keys: logical → physical.
pub const PROGRAM_SORT_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("provider", "provider.name"),
    ("location", "location.city"),
    ("price", "price.amount"),
    ("createdAt", "createdAt"),
    ("views", "analytics.views"),
    ("enrollments", "analytics.enrollments"),
];

/// Mapping table for a listing kind.
pub fn sort_fields(kind: ListingKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        ListingKind::Job => JOB_SORT_FIELDS,
        ListingKind::Program => PROGRAM_SORT_FIELDS,
    }
}

/// Physical sort: a document path and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::new(DEFAULT_SORT_FIELD, DEFAULT_SORT_DIRECTION)
    }
}

/// Outcome of resolving a logical sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortResolution {
    /// Key was found in the mapping table.
    Mapped(SortKey),
    /// Key was unknown; the creation-timestamp default is used instead.
    Fallback { requested: String, key: SortKey },
}

impl SortResolution {
    pub fn key(&self) -> &SortKey {
        match self {
            SortResolution::Mapped(key) | SortResolution::Fallback { key, .. } => key,
        }
    }

    pub fn into_key(self) -> SortKey {
        match self {
            SortResolution::Mapped(key) | SortResolution::Fallback { key, .. } => key,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SortResolution::Fallback { .. })
    }
}

/// Resolve `sort_by` against the kind's table.
///
/// Unknown keys ignore `direction` and fall back to `createdAt` descending.
pub fn resolve_sort(kind: ListingKind, sort_by: &str, direction: SortDirection) -> SortResolution {
    let wanted = sort_by.trim();
    match sort_fields(kind)
        .iter()
        .find(|(logical, _)| *logical == wanted)
    {
        Some((_, physical)) => SortResolution::Mapped(SortKey::new(*physical, direction)),
        None => {
            tracing::debug!(
                %kind,
                sort_by = wanted,
                fallback = DEFAULT_SORT_FIELD,
                "unknown sort key; using default sort"
            );
            SortResolution::Fallback {
                requested: wanted.to_string(),
                key: SortKey::default(),
            }
        }
    }
}

/// Resolve a logical key to its physical sort.
pub fn build_sort(kind: ListingKind, sort_by: &str, direction: SortDirection) -> SortKey {
    resolve_sort(kind, sort_by, direction).into_key()
}

/// Resolve an optional sort spec; `None` yields the default sort.
pub fn build_sort_spec(kind: ListingKind, spec: Option<&SortSpec>) -> SortKey {
    match spec {
        Some(spec) => build_sort(kind, &spec.sort_by, spec.sort_order),
        None => SortKey::default(),
    }
}
