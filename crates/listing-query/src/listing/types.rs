//! Listing query types.
//!
//! Provides the caller-facing criteria handed over by listing features:
//! - FilterSpec: raw, loosely-typed filter fields
//! - SortSpec: logical sort key and direction
//! - PaginationSpec: validated page/limit pair
//! - Page: a page of results with paging calculations

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 100;

/// Page size used when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Page size bounds applied when reading pagination from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }
}

/// User-chosen search/browse criteria before translation.
///
/// Text fields are kept exactly as received; trimming and range parsing
/// happen in [`FilterSpec::normalize`]. `tags` stays an untyped JSON value
/// so that a non-array can be reported instead of silently coerced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Job type for the job feed, category for the program catalog.
    #[serde(default, alias = "jobType", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,

    /// Salary or price range: `"min-max"` or `"min+"`.
    #[serde(
        default,
        alias = "salaryRange",
        alias = "priceRange",
        skip_serializing_if = "Option::is_none"
    )]
    pub range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<serde_json::Value>,
}

impl FilterSpec {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_experience_level(mut self, level: impl Into<String>) -> Self {
        self.experience_level = Some(level.into());
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_tags<S: AsRef<str>>(mut self, tags: &[S]) -> Self {
        self.tags = Some(serde_json::Value::Array(
            tags.iter()
                .map(|t| serde_json::Value::String(t.as_ref().to_string()))
                .collect(),
        ));
        self
    }

    /// Parse and validate every field. Fails on the first malformed one.
    pub fn normalize(&self) -> QueryResult<NormalizedFilters> {
        super::filter::normalize(self)
    }
}

/// Typed filters produced by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFilters {
    pub search: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub experience_level: Option<String>,
    pub range: Option<RangeBounds>,
    pub tags: Vec<String>,
}

impl NormalizedFilters {
    /// True when no filter contributes anything.
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.location.is_none()
            && self.category.is_none()
            && self.experience_level.is_none()
            && self.range.is_none()
            && self.tags.is_empty()
    }
}

/// Parsed numeric range. `max` is `None` for open-ended ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeBounds {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl RangeBounds {
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

/// Renders back to the range-string syntax accepted by the normalizer.
impl fmt::Display for RangeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, "{min}-{max}"),
            (Some(min), None) => write!(f, "{min}+"),
            (None, Some(max)) => write!(f, "0-{max}"),
            (None, None) => Ok(()),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Numeric form used by document stores: `1` ascending, `-1` descending.
    pub fn signum(self) -> i8 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "1" => Ok(SortDirection::Asc),
            "desc" | "-1" => Ok(SortDirection::Desc),
            _ => Err(QueryError::invalid_param("sortOrder", s)),
        }
    }
}

/// Requested sort: a logical key plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec {
    pub sort_by: String,
    #[serde(default)]
    pub sort_order: SortDirection,
}

impl SortSpec {
    pub fn new(sort_by: impl Into<String>, sort_order: SortDirection) -> Self {
        Self {
            sort_by: sort_by.into(),
            sort_order,
        }
    }
}

/// Validated pagination: `page >= 1` and `1 <= limit <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPagination")]
pub struct PaginationSpec {
    page: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct RawPagination {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

impl TryFrom<RawPagination> for PaginationSpec {
    type Error = QueryError;

    fn try_from(raw: RawPagination) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.limit)
    }
}

impl Default for PaginationSpec {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PaginationSpec {
    /// Validate against [`MAX_LIMIT`].
    pub fn new(page: u32, limit: u32) -> QueryResult<Self> {
        Self::with_max_limit(page, limit, MAX_LIMIT)
    }

    /// Validate against a configured ceiling.
    pub fn with_max_limit(page: u32, limit: u32, max_limit: u32) -> QueryResult<Self> {
        if page < 1 {
            return Err(QueryError::InvalidPagination(format!(
                "page must be at least 1, got {page}"
            )));
        }
        if limit < 1 || limit > max_limit {
            return Err(QueryError::InvalidPagination(format!(
                "limit must be between 1 and {max_limit}, got {limit}"
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip: `(page - 1) * limit`.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Total pages for `total` records: `ceil(total / limit)`.
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Total count (before paging).
    pub total: u64,

    /// Current page number (1-indexed).
    pub page: u32,

    pub limit: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Create a page with paging calculations.
    pub fn new(items: Vec<T>, total: u64, pagination: &PaginationSpec) -> Self {
        let total_pages = pagination.total_pages(total);
        let page = pagination.page();
        Self {
            items,
            total,
            page,
            limit: pagination.limit(),
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn skip_offset() {
        let p = PaginationSpec::new(2, 10).unwrap();
        assert_eq!(p.skip(), 10);
        assert_eq!(PaginationSpec::new(1, 25).unwrap().skip(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = PaginationSpec::new(1, 10).unwrap();
        assert_eq!(p.total_pages(95), 10);
        assert_eq!(p.total_pages(100), 10);
        assert_eq!(p.total_pages(0), 0);
    }

    #[test]
    fn pagination_bounds() {
        assert!(matches!(
            PaginationSpec::new(0, 10),
            Err(QueryError::InvalidPagination(_))
        ));
        assert!(PaginationSpec::new(1, 0).is_err());
        assert!(PaginationSpec::new(1, MAX_LIMIT).is_ok());
        assert!(PaginationSpec::new(1, MAX_LIMIT + 1).is_err());
        assert!(PaginationSpec::with_max_limit(1, 150, 200).is_ok());
    }

    #[test]
    fn pagination_deserializes_with_validation() {
        let p: PaginationSpec = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!(p.page(), 3);
        assert_eq!(p.limit(), DEFAULT_LIMIT);

        let bad = serde_json::from_str::<PaginationSpec>(r#"{"page": 1, "limit": 500}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn page_flags() {
        let p = PaginationSpec::new(2, 10).unwrap();
        let page = Page::new(vec![1, 2, 3], 25, &p);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);

        let last = Page::<u8>::new(vec![], 25, &PaginationSpec::new(3, 10).unwrap());
        assert!(!last.has_next);
    }

    #[test]
    fn filter_spec_accepts_vocabulary_aliases() {
        let spec: FilterSpec =
            serde_json::from_str(r#"{"jobType": "full-time", "salaryRange": "100000+"}"#).unwrap();
        assert_eq!(spec.category.as_deref(), Some("full-time"));
        assert_eq!(spec.range.as_deref(), Some("100000+"));

        let spec: FilterSpec =
            serde_json::from_str(r#"{"category": "design", "priceRange": "0-500"}"#).unwrap();
        assert_eq!(spec.category.as_deref(), Some("design"));
        assert_eq!(spec.range.as_deref(), Some("0-500"));
    }

    #[test]
    fn sort_direction_parsing() {
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("-1".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert!("sideways".parse::<SortDirection>().is_err());
        assert_eq!(SortDirection::Desc.signum(), -1);
    }

    #[test]
    fn range_display() {
        assert_eq!(RangeBounds::between(50_000, 80_000).to_string(), "50000-80000");
        assert_eq!(RangeBounds::at_least(100).to_string(), "100+");
    }
}
