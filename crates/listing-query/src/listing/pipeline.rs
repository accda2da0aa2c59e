//! Analytical aggregation pipelines.
//!
//! A [`Pipeline`] is an ordered list of engine-agnostic stages. The four
//! insight views (statistics, by company, by location, by skill) all start
//! with a match stage built by [`ListingQueryBuilder`], always scoped to
//! active public listings and optionally to one organization. Stage order
//! is part of the contract and adapters must execute it unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fields::{FieldMap, ListingKind};
use super::predicate::Predicate;
use super::query_builder::{ListingQueryBuilder, QueryOptions, STATUS_ACTIVE};
use super::types::{FilterSpec, SortDirection};
use crate::error::{QueryError, QueryResult};

/// Rows kept by the by-company insight.
pub const TOP_COMPANIES_LIMIT: usize = 10;

/// Rows kept by the by-location insight.
pub const TOP_LOCATIONS_LIMIT: usize = 10;

/// Rows kept by the by-skill insight.
pub const TOP_SKILLS_LIMIT: usize = 20;

/// Work-mode values counted by the by-location insight.
pub const WORK_MODE_REMOTE: &str = "remote";
pub const WORK_MODE_HYBRID: &str = "hybrid";

/// One aggregation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "spec", rename_all = "snake_case")]
pub enum PipelineStage {
    /// Keep documents matching the predicate.
    Match(Predicate),

    /// Emit one document per element of the array at the path. Documents
    /// with a missing or empty array are dropped.
    Unwind(String),

    /// Collapse documents sharing a key into one row per key.
    Group {
        key: GroupKey,
        aggregations: Vec<Aggregation>,
    },

    /// Add a computed field to every row.
    AddField { name: String, expression: Expression },

    Sort {
        field: String,
        direction: SortDirection,
    },

    Limit(usize),
}

/// Grouping key of a [`PipelineStage::Group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GroupKey {
    /// Single group over every document.
    None,
    /// Value of one document path.
    Field(String),
    /// Named parts, each taken from a document path.
    Compound(Vec<KeyPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub name: String,
    pub path: String,
}

impl KeyPart {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A named output column of a group stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub name: String,
    pub accumulator: Accumulator,
}

impl Aggregation {
    pub fn new(name: impl Into<String>, accumulator: Accumulator) -> Self {
        Self {
            name: name.into(),
            accumulator,
        }
    }
}

/// How a group column is accumulated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Accumulator {
    /// Number of documents in the group.
    Count,
    /// Sum of a numeric path; missing values count as zero.
    Sum(String),
    /// Mean of a numeric path over documents that have it.
    Avg(String),
    /// Number of documents for which the predicate holds.
    CountWhere(Predicate),
    /// Distinct values of a path, in first-seen order.
    AddToSet(String),
}

/// Computed-field expression evaluated per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum Expression {
    /// Value of a row field.
    Field(String),
    Number(f64),
    /// Sum of a field within the current row. For a scalar this is the
    /// value itself.
    GroupSum(String),
    /// Sum of a field across every row reaching this stage.
    TotalSum(String),
    /// Quotient; dividing by zero yields null.
    Divide(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn field(name: &str) -> Self {
        Expression::Field(name.to_string())
    }

    pub fn divide(lhs: Expression, rhs: Expression) -> Self {
        Expression::Divide(Box::new(lhs), Box::new(rhs))
    }

    pub fn multiply(lhs: Expression, rhs: Expression) -> Self {
        Expression::Multiply(Box::new(lhs), Box::new(rhs))
    }

    /// `TotalSum` fields referenced by this expression.
    pub fn total_sum_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_total_sums(&mut out);
        out
    }

    fn collect_total_sums<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::TotalSum(field) => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Expression::Divide(lhs, rhs) | Expression::Multiply(lhs, rhs) => {
                lhs.collect_total_sums(out);
                rhs.collect_total_sums(out);
            }
            Expression::Field(_) | Expression::Number(_) | Expression::GroupSum(_) => {}
        }
    }
}

/// Denominator used by the skill-share percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentagePolicy {
    /// Share of the sum of counts across all skill rows.
    #[default]
    GrandTotal,
    /// Legacy behaviour: each row is divided by its own count, so every
    /// skill reports 100.
    PerGroup,
}

impl PercentagePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            PercentagePolicy::GrandTotal => "grand_total",
            PercentagePolicy::PerGroup => "per_group",
        }
    }

    /// `count / denominator * 100` for this policy.
    pub fn expression(self, count_field: &str) -> Expression {
        let denominator = match self {
            PercentagePolicy::GrandTotal => Expression::TotalSum(count_field.to_string()),
            PercentagePolicy::PerGroup => Expression::GroupSum(count_field.to_string()),
        };
        Expression::multiply(
            Expression::divide(Expression::field(count_field), denominator),
            Expression::Number(100.0),
        )
    }
}

impl fmt::Display for PercentagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PercentagePolicy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "grand_total" | "total" => Ok(PercentagePolicy::GrandTotal),
            "per_group" | "group" => Ok(PercentagePolicy::PerGroup),
            _ => Err(QueryError::invalid_param("percentagePolicy", s)),
        }
    }
}

/// An ordered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<PipelineStage> {
        self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Predicate of the leading match stage, if any.
    pub fn match_predicate(&self) -> Option<&Predicate> {
        match self.stages.first() {
            Some(PipelineStage::Match(predicate)) => Some(predicate),
            _ => None,
        }
    }

    /// Stage names in order, e.g. `["match", "group"]`.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages
            .iter()
            .map(|stage| match stage {
                PipelineStage::Match(_) => "match",
                PipelineStage::Unwind(_) => "unwind",
                PipelineStage::Group { .. } => "group",
                PipelineStage::AddField { .. } => "add_field",
                PipelineStage::Sort { .. } => "sort",
                PipelineStage::Limit(_) => "limit",
            })
            .collect()
    }
}

/// The analytical views a pipeline can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Statistics,
    Company,
    Location,
    Skills,
}

impl InsightKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InsightKind::Statistics => "statistics",
            InsightKind::Company => "company",
            InsightKind::Location => "location",
            InsightKind::Skills => "skills",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statistics" | "stats" => Ok(InsightKind::Statistics),
            "company" | "companies" | "provider" | "providers" => Ok(InsightKind::Company),
            "location" | "locations" => Ok(InsightKind::Location),
            "skill" | "skills" => Ok(InsightKind::Skills),
            _ => Err(QueryError::invalid_param("insight", s)),
        }
    }
}

/// Builder for insight pipelines over one listing kind.
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    kind: ListingKind,
    organization_id: Option<String>,
    percentage: PercentagePolicy,
}

impl PipelineBuilder {
    pub fn new(kind: ListingKind) -> Self {
        Self {
            kind,
            organization_id: None,
            percentage: PercentagePolicy::default(),
        }
    }

    /// Scope every pipeline to one organization.
    pub fn for_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_percentage_policy(mut self, policy: PercentagePolicy) -> Self {
        self.percentage = policy;
        self
    }

    /// Build the pipeline for `insight`.
    pub fn build(
        &self,
        insight: InsightKind,
        filters: Option<&FilterSpec>,
    ) -> QueryResult<Pipeline> {
        match insight {
            InsightKind::Statistics => self.statistics(filters),
            InsightKind::Company => self.by_company(filters),
            InsightKind::Location => self.by_location(filters),
            InsightKind::Skills => self.by_skill(filters),
        }
    }

    /// Match → one keyless group with totals, flag counts and averages.
    pub fn statistics(&self, filters: Option<&FilterSpec>) -> QueryResult<Pipeline> {
        let matched = self.match_stage(filters)?;
        let f = self.fields();

        let mut aggregations = vec![Aggregation::new("total", Accumulator::Count)];
        for (label, path) in f.counters {
            aggregations.push(Aggregation::new(
                format!("total{}", capitalize(label)),
                Accumulator::Sum(path.to_string()),
            ));
        }
        aggregations.push(Aggregation::new(
            "featured",
            Accumulator::CountWhere(Predicate::equals(f.featured, true)),
        ));
        aggregations.push(Aggregation::new(
            "urgent",
            Accumulator::CountWhere(Predicate::equals(f.urgent, true)),
        ));
        aggregations.push(Aggregation::new(
            "avgViews",
            Accumulator::Avg(f.views.to_string()),
        ));
        aggregations.push(Aggregation::new(
            format!("avg{}", capitalize(f.engagement_label)),
            Accumulator::Avg(f.engagement.to_string()),
        ));
        aggregations.push(Aggregation::new(
            range_average_name(f),
            Accumulator::Avg(f.range.to_string()),
        ));

        Ok(self.finish(
            InsightKind::Statistics,
            vec![
                matched,
                PipelineStage::Group {
                    key: GroupKey::None,
                    aggregations,
                },
            ],
        ))
    }

    /// Match → group by organization name → sort by count → top 10.
    pub fn by_company(&self, filters: Option<&FilterSpec>) -> QueryResult<Pipeline> {
        let matched = self.match_stage(filters)?;
        let f = self.fields();
        let count = count_name(f);
        let engagement = capitalize(f.engagement_label);

        let aggregations = vec![
            Aggregation::new(count.clone(), Accumulator::Count),
            Aggregation::new(
                format!("active{}s", capitalize(f.noun)),
                Accumulator::CountWhere(Predicate::equals(f.status, STATUS_ACTIVE)),
            ),
            Aggregation::new("totalViews", Accumulator::Sum(f.views.to_string())),
            Aggregation::new(
                format!("total{engagement}"),
                Accumulator::Sum(f.engagement.to_string()),
            ),
            Aggregation::new("avgViews", Accumulator::Avg(f.views.to_string())),
            Aggregation::new(
                format!("avg{engagement}"),
                Accumulator::Avg(f.engagement.to_string()),
            ),
        ];

        Ok(self.finish(
            InsightKind::Company,
            vec![
                matched,
                PipelineStage::Group {
                    key: GroupKey::Field(f.organization_name.to_string()),
                    aggregations,
                },
                PipelineStage::Sort {
                    field: count,
                    direction: SortDirection::Desc,
                },
                PipelineStage::Limit(TOP_COMPANIES_LIMIT),
            ],
        ))
    }

    /// Match → group by (city, country) → sort by count → top 10.
    pub fn by_location(&self, filters: Option<&FilterSpec>) -> QueryResult<Pipeline> {
        let matched = self.match_stage(filters)?;
        let f = self.fields();
        let count = count_name(f);
        let noun = capitalize(f.noun);

        let aggregations = vec![
            Aggregation::new(count.clone(), Accumulator::Count),
            Aggregation::new(
                format!("remote{noun}s"),
                Accumulator::CountWhere(Predicate::equals(f.work_mode, WORK_MODE_REMOTE)),
            ),
            Aggregation::new(
                format!("hybrid{noun}s"),
                Accumulator::CountWhere(Predicate::equals(f.work_mode, WORK_MODE_HYBRID)),
            ),
            Aggregation::new(range_average_name(f), Accumulator::Avg(f.range.to_string())),
        ];

        Ok(self.finish(
            InsightKind::Location,
            vec![
                matched,
                PipelineStage::Group {
                    key: GroupKey::Compound(vec![
                        KeyPart::new("city", f.city),
                        KeyPart::new("country", f.country),
                    ]),
                    aggregations,
                },
                PipelineStage::Sort {
                    field: count,
                    direction: SortDirection::Desc,
                },
                PipelineStage::Limit(TOP_LOCATIONS_LIMIT),
            ],
        ))
    }

    /// Match → unwind skills → group by skill → percentage → sort → top 20.
    pub fn by_skill(&self, filters: Option<&FilterSpec>) -> QueryResult<Pipeline> {
        let matched = self.match_stage(filters)?;
        let f = self.fields();

        Ok(self.finish(
            InsightKind::Skills,
            vec![
                matched,
                PipelineStage::Unwind(f.skills.to_string()),
                PipelineStage::Group {
                    key: GroupKey::Field(f.skills.to_string()),
                    aggregations: vec![
                        Aggregation::new("count", Accumulator::Count),
                        Aggregation::new("documents", Accumulator::AddToSet(f.id.to_string())),
                    ],
                },
                PipelineStage::AddField {
                    name: "percentage".to_string(),
                    expression: self.percentage.expression("count"),
                },
                PipelineStage::Sort {
                    field: "count".to_string(),
                    direction: SortDirection::Desc,
                },
                PipelineStage::Limit(TOP_SKILLS_LIMIT),
            ],
        ))
    }

    fn fields(&self) -> &'static FieldMap {
        self.kind.fields()
    }

    /// Normalizes filters before any stage exists, so a malformed filter
    /// never yields a partial pipeline.
    fn match_stage(&self, filters: Option<&FilterSpec>) -> QueryResult<PipelineStage> {
        let options = QueryOptions {
            organization_id: self.organization_id.clone(),
            ..QueryOptions::default()
        };
        let predicate = ListingQueryBuilder::new(self.kind)
            .with_options(options)
            .build(filters)?;
        Ok(PipelineStage::Match(predicate))
    }

    fn finish(&self, insight: InsightKind, stages: Vec<PipelineStage>) -> Pipeline {
        let pipeline = Pipeline::new(stages);
        tracing::debug!(
            kind = %self.kind,
            %insight,
            stages = pipeline.len(),
            percentage = %self.percentage,
            "built insight pipeline"
        );
        pipeline
    }
}

/// Build the `insight` pipeline for `kind` with default settings.
pub fn build_insight_pipeline(
    kind: ListingKind,
    insight: InsightKind,
    filters: Option<&FilterSpec>,
) -> QueryResult<Pipeline> {
    PipelineBuilder::new(kind).build(insight, filters)
}

fn count_name(fields: &FieldMap) -> String {
    format!("{}Count", fields.noun)
}

fn range_average_name(fields: &FieldMap) -> String {
    format!("avg{}", capitalize(fields.range_param))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
