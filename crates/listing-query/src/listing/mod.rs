//! Listing query translation.
//!
//! This module provides:
//! - FilterNormalizer: range parsing, text trimming, array validation
//! - ParamsBuilder: ordered request parameters for remote listing calls
//! - ListingQueryBuilder: engine-agnostic predicate trees
//! - SortBuilder: logical sort keys mapped to document paths
//! - PipelineBuilder: statistics and top-N insight pipelines
//! - Adapters: document-store JSON, PostgreSQL via SeaQuery, in-memory
//!   execution

pub mod document;
pub mod fields;
pub mod filter;
pub mod memory;
pub mod params;
pub mod pipeline;
pub mod predicate;
mod query_builder;
mod sort;
pub mod sql;
pub mod types;

pub use fields::{FieldMap, ListingKind};
pub use filter::{normalize, normalize_text, parse_range, validate_array};
pub use params::{
    ParsedParams, QueryParams, build_query_params, parse_query_params,
    parse_query_params_with_limits, parse_query_string, parse_query_string_with_limits,
};
pub use pipeline::{
    Accumulator, Aggregation, Expression, GroupKey, InsightKind, KeyPart, PercentagePolicy,
    Pipeline, PipelineBuilder, PipelineStage, build_insight_pipeline,
};
pub use predicate::{FieldValue, Predicate};
pub use query_builder::{
    ListingQueryBuilder, QueryOptions, STATUS_ACTIVE, Scope, VISIBILITY_PUBLIC,
    build_filter_predicate, default_scope,
};
pub use sort::{
    DEFAULT_SORT_DIRECTION, DEFAULT_SORT_FIELD, JOB_SORT_FIELDS, PROGRAM_SORT_FIELDS, SortKey,
    SortResolution, build_sort, build_sort_spec, resolve_sort, sort_fields,
};
pub use sql::ListingSqlBuilder;
pub use types::{
    DEFAULT_LIMIT, FilterSpec, MAX_LIMIT, NormalizedFilters, Page, PageLimits, PaginationSpec,
    RangeBounds, SortDirection, SortSpec,
};
