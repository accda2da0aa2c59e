#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Predicate and sort integration tests.

use listing_query::QueryError;
use listing_query::listing::{
    FilterSpec, ListingKind, Predicate, QueryOptions, SortDirection, SortKey, SortSpec,
    build_filter_predicate, build_sort, build_sort_spec, document, resolve_sort,
};
use serde_json::json;

// -------------------------------------------------------------------------
// Predicates
// -------------------------------------------------------------------------

#[test]
fn engineer_search_predicate() {
    let filters: FilterSpec =
        serde_json::from_str(r#"{"search": "engineer", "salaryRange": "100000+"}"#).unwrap();
    let predicate =
        build_filter_predicate(ListingKind::Job, Some(&filters), &QueryOptions::default())
            .unwrap();

    assert_eq!(
        predicate,
        Predicate::and(vec![
            Predicate::regex_or(
                &["title", "description", "company.name", "requirements.skills"],
                "engineer"
            ),
            Predicate::range("salary.min", Some(100_000), None),
            Predicate::equals("status", "active"),
            Predicate::equals("visibility", "public"),
        ])
    );
}

#[test]
fn empty_filters_are_default_scope() {
    let predicate =
        build_filter_predicate(ListingKind::Program, None, &QueryOptions::default()).unwrap();
    assert_eq!(predicate.fields(), vec!["status", "visibility"]);
}

#[test]
fn every_error_surfaces_before_output() {
    let cases = [
        (json!({"salaryRange": "abc-100"}), "range"),
        (json!({"salaryRange": "90-10"}), "range"),
        (json!({"salaryRange": "100"}), "range"),
        (json!({"tags": "remote"}), "tags"),
        (json!({"tags": [1, 2]}), "tags"),
    ];
    for (raw, what) in cases {
        let filters: FilterSpec = serde_json::from_value(raw).unwrap();
        let result =
            build_filter_predicate(ListingKind::Job, Some(&filters), &QueryOptions::default());
        match what {
            "range" => assert!(matches!(result, Err(QueryError::MalformedRange { .. }))),
            _ => assert!(matches!(result, Err(QueryError::TypeMismatch { .. }))),
        }
    }
}

#[test]
fn predicate_document_rendering() {
    let filters = FilterSpec::default()
        .with_location("Berlin")
        .with_range("50000-80000");
    let predicate =
        build_filter_predicate(ListingKind::Job, Some(&filters), &QueryOptions::default())
            .unwrap();

    assert_eq!(
        document::predicate_document(&predicate),
        json!({"$and": [
            {"$or": [
                {"location.city": {"$regex": "Berlin", "$options": "i"}},
                {"location.country": {"$regex": "Berlin", "$options": "i"}}
            ]},
            {"salary.min": {"$gte": 50000, "$lte": 80000}},
            {"status": "active"},
            {"visibility": "public"}
        ]})
    );
}

#[test]
fn predicate_serializes_for_external_engines() {
    let predicate = build_filter_predicate(
        ListingKind::Job,
        Some(&FilterSpec::default().with_category("full-time")),
        &QueryOptions::unrestricted(),
    )
    .unwrap();
    assert_eq!(
        serde_json::to_value(&predicate).unwrap(),
        json!({
            "op": "conjunction",
            "children": [{"op": "equals", "field": "jobType", "value": "full-time"}]
        })
    );
}

// -------------------------------------------------------------------------
// Sort
// -------------------------------------------------------------------------

#[test]
fn unknown_sort_key_is_newest_first() {
    assert_eq!(
        build_sort(ListingKind::Job, "nonexistent-key", SortDirection::Asc),
        SortKey::new("createdAt", SortDirection::Desc)
    );
    let resolution = resolve_sort(ListingKind::Job, "nonexistent-key", SortDirection::Asc);
    assert!(resolution.is_fallback());
}

#[test]
fn sort_document_rendering() {
    let key = build_sort_spec(
        ListingKind::Job,
        Some(&SortSpec::new("applications", SortDirection::Asc)),
    );
    assert_eq!(
        document::sort_document(&key),
        json!({"analytics.applications": 1})
    );
}
