//! Filter normalization.
//!
//! Turns stringly-typed filter fields into typed values. Range strings are
//! either `"min-max"` or `"min+"`; both bounds are non-negative integers.
//! Blank text is treated as absent rather than as a match on the empty
//! string.

use serde_json::Value;

use super::types::{FilterSpec, NormalizedFilters, RangeBounds};
use crate::error::{QueryError, QueryResult};

/// Parse a range string into bounds.
pub fn parse_range(input: &str) -> QueryResult<RangeBounds> {
    let trimmed = input.trim();

    if let Some((min, max)) = trimmed.split_once('-') {
        let min = parse_bound(input, "lower", min)?;
        let max = parse_bound(input, "upper", max)?;
        if min > max {
            return Err(QueryError::malformed_range(
                input,
                format!("lower bound {min} exceeds upper bound {max}"),
            ));
        }
        return Ok(RangeBounds::between(min, max));
    }

    if let Some(min) = trimmed.strip_suffix('+') {
        let min = parse_bound(input, "lower", min)?;
        return Ok(RangeBounds::at_least(min));
    }

    Err(QueryError::malformed_range(
        input,
        "expected \"min-max\" or \"min+\"",
    ))
}

/// Parse an optional range. Absent or blank input yields no range at all.
pub fn parse_optional_range(input: Option<&str>) -> QueryResult<Option<RangeBounds>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_range(s).map(Some),
    }
}

fn parse_bound(input: &str, side: &str, text: &str) -> QueryResult<i64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QueryError::malformed_range(
            input,
            format!("{side} bound {text:?} is not a number"),
        ));
    }
    text.parse::<i64>().map_err(|_| {
        QueryError::malformed_range(input, format!("{side} bound {text:?} is out of range"))
    })
}

/// Trim a text filter. Empty after trimming means absent.
pub fn normalize_text(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Validate an array-typed filter value and extract its strings.
///
/// `null` counts as absent. Elements are trimmed and blanks dropped.
pub fn validate_array(field: &str, value: &Value) -> QueryResult<Vec<String>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(QueryError::TypeMismatch {
                field: field.to_string(),
                expected: "array",
                found: json_kind(other),
            });
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(s) = item else {
            return Err(QueryError::TypeMismatch {
                field: field.to_string(),
                expected: "array of strings",
                found: json_kind(item),
            });
        };
        let s = s.trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
    }
    Ok(out)
}

/// Name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalize every field of a filter spec, failing on the first error.
pub fn normalize(spec: &FilterSpec) -> QueryResult<NormalizedFilters> {
    let range = parse_optional_range(spec.range.as_deref())?;
    let tags = match &spec.tags {
        Some(value) => validate_array("tags", value)?,
        None => Vec::new(),
    };

    let normalized = NormalizedFilters {
        search: normalize_text(spec.search.as_deref()),
        location: normalize_text(spec.location.as_deref()),
        category: normalize_text(spec.category.as_deref()),
        experience_level: normalize_text(spec.experience_level.as_deref()),
        range,
        tags,
    };
    tracing::trace!(?normalized, "normalized listing filters");
    Ok(normalized)
}
