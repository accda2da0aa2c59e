//! Remote API request parameters.
//!
//! Serializes pagination, normalized filters and sort into an ordered list
//! of key/value pairs. Key order is fixed (page, limit, filters in
//! declaration order, sort) so equal inputs always produce equal output.

use serde::Serialize;

use super::fields::ListingKind;
use super::types::{FilterSpec, PageLimits, PaginationSpec, RangeBounds, SortDirection, SortSpec};
use crate::error::{QueryError, QueryResult};

/// Ordered request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<(String, String)> {
        self.0
    }

    /// Percent-encoded `key=value&...` string.
    pub fn to_query_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl IntoIterator for QueryParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Build request parameters for a remote listing call.
///
/// Filters are normalized first; a malformed filter fails the whole call.
pub fn build_query_params(
    kind: ListingKind,
    pagination: &PaginationSpec,
    filters: Option<&FilterSpec>,
    sort: Option<&SortSpec>,
) -> QueryResult<QueryParams> {
    let normalized = filters.map(FilterSpec::normalize).transpose()?;
    let fields = kind.fields();
    let mut params = QueryParams::default();

    params.push("page", pagination.page().to_string());
    params.push("limit", pagination.limit().to_string());

    if let Some(f) = normalized {
        if let Some(search) = f.search {
            params.push("search", search);
        }
        if let Some(location) = f.location {
            params.push("location", location);
        }
        if let Some(category) = f.category {
            params.push(fields.category_param, category);
        }
        if let Some(level) = f.experience_level {
            params.push("experienceLevel", level);
        }
        if let Some(range) = f.range {
            if let Some(min) = range.min {
                params.push(fields.range_min_param(), min.to_string());
            }
            if let Some(max) = range.max {
                params.push(fields.range_max_param(), max.to_string());
            }
        }
        for tag in f.tags {
            params.push("tags", tag);
        }
    }

    if let Some(sort) = sort {
        let sort_by = sort.sort_by.trim();
        if !sort_by.is_empty() {
            params.push("sortBy", sort_by);
            params.push("sortOrder", sort.sort_order.as_str());
        }
    }

    tracing::trace!(%kind, count = params.len(), "built query params");
    Ok(params)
}

/// Criteria reconstructed from request parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedParams {
    pub pagination: PaginationSpec,
    pub filters: FilterSpec,
    pub sort: Option<SortSpec>,
}

/// Reconstruct criteria from request parameters.
///
/// Inverse of [`build_query_params`]: missing `page`/`limit` default to 1
/// and [`DEFAULT_LIMIT`](super::types::DEFAULT_LIMIT), the range is
/// reassembled into `"min-max"` or `"min+"`, repeated `tags` keys collect
/// into an array. Unknown keys are ignored.
pub fn parse_query_params<I, K, V>(kind: ListingKind, pairs: I) -> QueryResult<ParsedParams>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    parse_query_params_with_limits(kind, pairs, PageLimits::default())
}

/// [`parse_query_params`] with configured page size bounds.
pub fn parse_query_params_with_limits<I, K, V>(
    kind: ListingKind,
    pairs: I,
    limits: PageLimits,
) -> QueryResult<ParsedParams>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let fields = kind.fields();
    let range_min_key = fields.range_min_param();
    let range_max_key = fields.range_max_param();

    let mut page = 1;
    let mut limit = limits.default_limit;
    let mut filters = FilterSpec::default();
    let mut range = RangeBounds::default();
    let mut tags = Vec::new();
    let mut sort_by = None;
    let mut sort_order = SortDirection::default();

    for (key, value) in pairs {
        let (key, value) = (key.as_ref(), value.as_ref());
        match key {
            "page" => page = parse_number(key, value)?,
            "limit" => limit = parse_number(key, value)?,
            "search" => filters.search = Some(value.to_string()),
            "location" => filters.location = Some(value.to_string()),
            "experienceLevel" => filters.experience_level = Some(value.to_string()),
            "tags" => tags.push(serde_json::Value::String(value.to_string())),
            "sortBy" => sort_by = Some(value.to_string()),
            "sortOrder" => sort_order = value.parse()?,
            k if k == fields.category_param => filters.category = Some(value.to_string()),
            k if k == range_min_key => range.min = Some(parse_number(key, value)?),
            k if k == range_max_key => range.max = Some(parse_number(key, value)?),
            other => tracing::trace!(key = other, "ignoring unknown query parameter"),
        }
    }

    filters.range = match (range.min, range.max) {
        (None, None) => None,
        (Some(_), _) => Some(range.to_string()),
        (None, Some(max)) => {
            return Err(QueryError::malformed_range(
                &format!("-{max}"),
                format!("{range_max_key} given without {range_min_key}"),
            ));
        }
    };
    if !tags.is_empty() {
        filters.tags = Some(serde_json::Value::Array(tags));
    }

    Ok(ParsedParams {
        pagination: PaginationSpec::with_max_limit(page, limit, limits.max_limit)?,
        filters,
        sort: sort_by.map(|by| SortSpec::new(by, sort_order)),
    })
}

/// Parse a percent-encoded query string (without the leading `?`).
pub fn parse_query_string(kind: ListingKind, query: &str) -> QueryResult<ParsedParams> {
    parse_query_string_with_limits(kind, query, PageLimits::default())
}

/// [`parse_query_string`] with configured page size bounds.
pub fn parse_query_string_with_limits(
    kind: ListingKind,
    query: &str,
    limits: PageLimits,
) -> QueryResult<ParsedParams> {
    let mut pairs = Vec::new();
    for part in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        pairs.push((decode(key)?, decode(value)?));
    }
    parse_query_params_with_limits(kind, pairs, limits)
}

fn decode(raw: &str) -> QueryResult<String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| QueryError::invalid_param("query", raw))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> QueryResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| QueryError::invalid_param(key, value))
}
