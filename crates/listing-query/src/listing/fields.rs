//! Listing kinds and their physical field layouts.
//!
//! The job feed and the training-program catalog share every translation
//! algorithm. What differs is the parameter vocabulary exposed to remote
//! callers and the document paths the predicates and pipelines refer to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Which listing feature a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    /// Job feed.
    #[default]
    Job,
    /// Training-program catalog.
    Program,
}

impl ListingKind {
    /// Physical field layout for this kind.
    pub fn fields(self) -> &'static FieldMap {
        match self {
            ListingKind::Job => &JOB_FIELDS,
            ListingKind::Program => &PROGRAM_FIELDS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListingKind::Job => "job",
            ListingKind::Program => "program",
        }
    }
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "job" | "jobs" => Ok(ListingKind::Job),
            "program" | "programs" => Ok(ListingKind::Program),
            other => Err(QueryError::invalid_param("kind", other)),
        }
    }
}

/// Logical parameter names and physical document paths for one listing kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    /// Singular noun used in insight aggregate names ("job" → "jobCount").
    pub noun: &'static str,
    /// Request parameter carrying the categorical filter.
    pub category_param: &'static str,
    /// Prefix of the two range parameters ("salary" → "salaryMin").
    pub range_param: &'static str,

    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub organization_name: &'static str,
    pub organization_id: &'static str,
    pub city: &'static str,
    pub country: &'static str,
    pub skills: &'static str,
    pub tags: &'static str,
    pub category: &'static str,
    pub experience_level: &'static str,
    /// Numeric lower bound targeted by range filters.
    pub range: &'static str,
    pub status: &'static str,
    pub visibility: &'static str,
    pub created_at: &'static str,
    pub views: &'static str,
    /// Primary engagement counter (applications or enrollments).
    pub engagement: &'static str,
    /// Name of the engagement counter in aggregate output.
    pub engagement_label: &'static str,
    pub featured: &'static str,
    pub urgent: &'static str,
    pub work_mode: &'static str,
    /// Analytics counters summed by the statistics insight, as
    /// `(label, path)` pairs.
    pub counters: &'static [(&'static str, &'static str)],
}

impl FieldMap {
    /// Fields a free-text search is matched against.
    pub fn search_fields(&self) -> [&'static str; 4] {
        [
            self.title,
            self.description,
            self.organization_name,
            self.skills,
        ]
    }

    /// Fields a location filter is matched against.
    pub fn location_fields(&self) -> [&'static str; 2] {
        [self.city, self.country]
    }

    /// Fields that hold arrays of strings rather than scalars.
    pub fn array_fields(&self) -> [&'static str; 2] {
        [self.skills, self.tags]
    }

    pub fn range_min_param(&self) -> String {
        format!("{}Min", self.range_param)
    }

    pub fn range_max_param(&self) -> String {
        format!("{}Max", self.range_param)
    }
}

pub static JOB_FIELDS: FieldMap = FieldMap {
    noun: "job",
    category_param: "jobType",
    range_param: "salary",
    id: "_id",
    title: "title",
    description: "description",
    organization_name: "company.name",
    organization_id: "company.id",
    city: "location.city",
    country: "location.country",
    skills: "requirements.skills",
    tags: "tags",
    category: "jobType",
    experience_level: "experienceLevel",
    range: "salary.min",
    status: "status",
    visibility: "visibility",
    created_at: "createdAt",
    views: "analytics.views",
    engagement: "analytics.applications",
    engagement_label: "applications",
    featured: "isFeatured",
    urgent: "isUrgent",
    work_mode: "workMode",
    counters: &[
        ("views", "analytics.views"),
        ("applications", "analytics.applications"),
        ("shortlisted", "analytics.shortlisted"),
        ("hired", "analytics.hired"),
    ],
};

pub static PROGRAM_FIELDS: FieldMap = FieldMap {
    noun: "program",
    category_param: "category",
    range_param: "price",
    id: "_id",
    title: "title",
    description: "description",
    organization_name: "provider.name",
    organization_id: "provider.id",
    city: "location.city",
    country: "location.country",
    skills: "skills",
    tags: "tags",
    category: "category",
    experience_level: "level",
    range: "price.amount",
    status: "status",
    visibility: "visibility",
    created_at: "createdAt",
    views: "analytics.views",
    engagement: "analytics.enrollments",
    engagement_label: "enrollments",
    featured: "isFeatured",
    urgent: "isUrgent",
    work_mode: "deliveryMode",
    counters: &[
        ("views", "analytics.views"),
        ("enrollments", "analytics.enrollments"),
        ("completions", "analytics.completions"),
    ],
};
