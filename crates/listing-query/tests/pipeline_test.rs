#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Insight pipeline integration tests.
//!
//! Pipelines are built with the public builder and executed against
//! fixture documents with the in-memory executor.

use listing_query::listing::{
    FilterSpec, InsightKind, ListingKind, PercentagePolicy, PipelineBuilder, memory,
};
use listing_query_test_utils::{documents, test_job, test_program};
use serde_json::{Value, json};

fn skills_fixture() -> Vec<Value> {
    documents(&[
        test_job("Backend").with_skills(&["Go"]),
        test_job("Platform").with_skills(&["Go", "Rust"]),
        test_job("Closed").with_skills(&["Rust", "Go"]).closed(),
        test_job("No skills"),
    ])
}

fn approx(value: &Value, expected: f64) -> bool {
    value.as_f64().is_some_and(|v| (v - expected).abs() < 1e-9)
}

// -------------------------------------------------------------------------
// By skill
// -------------------------------------------------------------------------

#[test]
fn skill_counts_and_order() {
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .by_skill(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &skills_fixture());

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["_id"], "Go");
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(rows[1]["_id"], "Rust");
    assert_eq!(rows[1]["count"], 1);
    assert_eq!(rows[0]["documents"].as_array().unwrap().len(), 2);
}

#[test]
fn skill_percentage_of_grand_total() {
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .with_percentage_policy(PercentagePolicy::GrandTotal)
        .by_skill(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &skills_fixture());

    assert!(approx(&rows[0]["percentage"], 200.0 / 3.0));
    assert!(approx(&rows[1]["percentage"], 100.0 / 3.0));
}

#[test]
fn skill_percentage_per_group_is_always_100() {
    // Legacy denominator: each row divided by its own count.
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .with_percentage_policy(PercentagePolicy::PerGroup)
        .by_skill(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &skills_fixture());

    assert!(rows.iter().all(|row| approx(&row["percentage"], 100.0)));
}

#[test]
fn skill_limit_is_twenty() {
    let skills: Vec<String> = (0..25).map(|i| format!("skill-{i:02}")).collect();
    let refs: Vec<&str> = skills.iter().map(String::as_str).collect();
    let docs = documents(&[test_job("Generalist").with_skills(&refs)]);

    let pipeline = PipelineBuilder::new(ListingKind::Job)

        .by_skill(None)

        .unwrap();
    assert_eq!(memory::execute(&pipeline, &docs).len(), 20);
}

// -------------------------------------------------------------------------
// Statistics
// -------------------------------------------------------------------------

#[test]
fn statistics_over_public_listings() {
    let docs = documents(&[
        test_job("A")
            .with_views(10)
            .with_engagement(2)
            .with_range_min(50_000)
            .featured(),
        test_job("B")
            .with_views(30)
            .with_engagement(4)
            .with_range_min(70_000)
            .urgent(),
        test_job("Hidden").with_views(1000).private(),
    ]);

    let pipeline = PipelineBuilder::new(ListingKind::Job)

        .statistics(None)

        .unwrap();
    let rows = memory::execute(&pipeline, &docs);

    assert_eq!(rows.len(), 1);
    let stats = &rows[0];
    assert_eq!(stats["_id"], Value::Null);
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["totalViews"], 40);
    assert_eq!(stats["totalApplications"], 6);
    assert_eq!(stats["totalHired"], 0);
    assert_eq!(stats["featured"], 1);
    assert_eq!(stats["urgent"], 1);
    assert!(approx(&stats["avgViews"], 20.0));
    assert!(approx(&stats["avgApplications"], 3.0));
    assert!(approx(&stats["avgSalary"], 60_000.0));
}

#[test]
fn statistics_with_filters() {
    let docs = documents(&[
        test_job("Rust Engineer").with_views(5),
        test_job("Chef").with_views(7),
    ]);
    let filters = FilterSpec::default().with_search("engineer");
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .build(InsightKind::Statistics, Some(&filters))
        .unwrap();
    let rows = memory::execute(&pipeline, &docs);
    assert_eq!(rows[0]["total"], 1);
    assert_eq!(rows[0]["totalViews"], 5);
}

// -------------------------------------------------------------------------
// By company / by location
// -------------------------------------------------------------------------

#[test]
fn companies_ranked_by_job_count() {
    let mut listings = Vec::new();
    for i in 0..12 {
        // company-00 gets 12 jobs, company-11 gets 1
        for _ in 0..(12 - i) {
            listings.push(
                test_job("Job")
                    .with_company(&format!("c{i}"), &format!("company-{i:02}"))
                    .with_views(3),
            );
        }
    }
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .by_company(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &documents(&listings));

    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["_id"], "company-00");
    assert_eq!(rows[0]["jobCount"], 12);
    assert_eq!(rows[0]["activeJobs"], 12);
    assert_eq!(rows[0]["totalViews"], 36);
    assert_eq!(rows[9]["_id"], "company-09");
}

#[test]
fn organization_scope_limits_groups() {
    let docs = documents(&[
        test_job("a").with_company("org-1", "Acme"),
        test_job("b").with_company("org-2", "Globex"),
    ]);
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .for_organization("org-2")
        .by_company(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &docs);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["_id"], "Globex");
}

#[test]
fn locations_group_by_city_and_country() {
    let docs = documents(&[
        test_job("a")
            .with_location("Berlin", "Germany")
            .remote()
            .with_range_min(60_000),
        test_job("b")
            .with_location("Berlin", "Germany")
            .hybrid()
            .with_range_min(80_000),
        test_job("c").with_location("Paris", "France"),
    ]);
    let pipeline = PipelineBuilder::new(ListingKind::Job)
        .by_location(None)
        .unwrap();
    let rows = memory::execute(&pipeline, &docs);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["_id"], json!({"city": "Berlin", "country": "Germany"}));
    assert_eq!(rows[0]["jobCount"], 2);
    assert_eq!(rows[0]["remoteJobs"], 1);
    assert_eq!(rows[0]["hybridJobs"], 1);
    assert!(approx(&rows[0]["avgSalary"], 70_000.0));
}

#[test]
fn program_insights_use_program_vocabulary() {
    let docs = documents(&[
        test_program("Go 101")
            .with_company("p-1", "Academy")
            .with_skills(&["Go"])
            .with_engagement(30),
        test_program("Rust 101")
            .with_company("p-1", "Academy")
            .with_skills(&["Rust"])
            .with_engagement(10),
    ]);
    let builder = PipelineBuilder::new(ListingKind::Program);

    let providers = memory::execute(&builder.by_company(None).unwrap(), &docs);
    assert_eq!(providers[0]["programCount"], 2);
    assert_eq!(providers[0]["totalEnrollments"], 40);

    let skills = memory::execute(&builder.by_skill(None).unwrap(), &docs);
    assert_eq!(skills.len(), 2);
    assert!(skills.iter().all(|row| approx(&row["percentage"], 50.0)));
}
