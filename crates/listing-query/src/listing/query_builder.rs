//! Listing predicate builder.
//!
//! Builds the WHERE-clause predicate for a listing from caller filters:
//! - Free-text search across title, description, organization and skills
//! - Location substring match on city or country
//! - Categorical and experience-level equality
//! - Salary/price range on the lower-bound field
//! - Tag membership
//! - Default visibility scope (active + public) unless overridden

use serde::{Deserialize, Serialize};

use super::fields::ListingKind;
use super::predicate::{FieldValue, Predicate};
use super::types::{FilterSpec, NormalizedFilters};
use crate::error::QueryResult;

/// Status value required by the default scope.
pub const STATUS_ACTIVE: &str = "active";

/// Visibility value required by the default scope.
pub const VISIBILITY_PUBLIC: &str = "public";

/// Which documents a query may see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Only active, public listings.
    #[default]
    Public,
    /// No status/visibility restriction (administrative or author views).
    Unrestricted,
}

/// Caller-controlled scoping applied on top of the filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub scope: Scope,

    /// Restrict to one organization (tenant).
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl QueryOptions {
    pub fn unrestricted() -> Self {
        Self {
            scope: Scope::Unrestricted,
            organization_id: None,
        }
    }

    pub fn for_organization(organization_id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Public,
            organization_id: Some(organization_id.into()),
        }
    }
}

/// Predicate builder for one listing kind.
#[derive(Debug, Clone)]
pub struct ListingQueryBuilder {
    kind: ListingKind,
    options: QueryOptions,
}

impl ListingQueryBuilder {
    pub fn new(kind: ListingKind) -> Self {
        Self {
            kind,
            options: QueryOptions::default(),
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Normalize `filters` and build the conjunction.
    pub fn build(&self, filters: Option<&FilterSpec>) -> QueryResult<Predicate> {
        let normalized = match filters {
            Some(spec) => spec.normalize()?,
            None => NormalizedFilters::default(),
        };
        Ok(self.build_normalized(&normalized))
    }

    /// Build the conjunction from already-normalized filters.
    ///
    /// Each present filter contributes exactly one child; absent filters
    /// contribute nothing.
    pub fn build_normalized(&self, filters: &NormalizedFilters) -> Predicate {
        let fields = self.kind.fields();
        let mut children = Vec::new();

        if let Some(ref search) = filters.search {
            children.push(Predicate::regex_or(&fields.search_fields(), search));
        }

        if let Some(ref location) = filters.location {
            children.push(Predicate::regex_or(&fields.location_fields(), location));
        }

        if let Some(ref category) = filters.category {
            children.push(Predicate::equals(fields.category, category.as_str()));
        }

        if let Some(ref level) = filters.experience_level {
            children.push(Predicate::equals(fields.experience_level, level.as_str()));
        }

        if let Some(range) = filters.range {
            children.push(Predicate::range(fields.range, range.min, range.max));
        }

        if !filters.tags.is_empty() {
            children.push(Predicate::In {
                field: fields.tags.to_string(),
                values: filters
                    .tags
                    .iter()
                    .map(|t| FieldValue::String(t.clone()))
                    .collect(),
            });
        }

        if let Some(ref org) = self.options.organization_id {
            children.push(Predicate::equals(fields.organization_id, org.as_str()));
        }

        if self.options.scope == Scope::Public {
            children.extend(default_scope(self.kind));
        }

        tracing::debug!(
            kind = %self.kind,
            predicates = children.len(),
            scope = ?self.options.scope,
            "built listing predicate"
        );

        Predicate::and(children)
    }
}

/// The default-scope predicates: `status == active`, `visibility == public`.
pub fn default_scope(kind: ListingKind) -> [Predicate; 2] {
    let fields = kind.fields();
    [
        Predicate::equals(fields.status, STATUS_ACTIVE),
        Predicate::equals(fields.visibility, VISIBILITY_PUBLIC),
    ]
}

/// Build the filter predicate for `kind`.
pub fn build_filter_predicate(
    kind: ListingKind,
    filters: Option<&FilterSpec>,
    options: &QueryOptions,
) -> QueryResult<Predicate> {
    ListingQueryBuilder::new(kind)
        .with_options(options.clone())
        .build(filters)
}
