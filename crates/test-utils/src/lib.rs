//! Listing query test utilities.
//!
//! Fixture builders producing job and program documents in the layout the
//! listing translators target, for use with the in-memory executor.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Document layout of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureKind {
    Job,
    Program,
}

/// Create an active, public job with default values.
pub fn test_job(title: &str) -> TestListing {
    TestListing::new(FixtureKind::Job, title)
}

/// Create an active, public training program with default values.
pub fn test_program(title: &str) -> TestListing {
    TestListing::new(FixtureKind::Program, title)
}

/// Render every fixture to its document.
pub fn documents(listings: &[TestListing]) -> Vec<JsonValue> {
    listings.iter().map(TestListing::to_document).collect()
}

/// A listing builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestListing {
    pub kind: FixtureKind,
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub organization_id: String,
    pub organization_name: String,
    pub city: String,
    pub country: String,
    pub skills: Vec<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub experience_level: String,
    pub range_min: i64,
    pub views: i64,
    pub engagement: i64,
    pub featured: bool,
    pub urgent: bool,
    pub status: String,
    pub visibility: String,
    pub work_mode: String,
    pub created_at: DateTime<Utc>,
}

impl TestListing {
    fn new(kind: FixtureKind, title: &str) -> Self {
        let (category, level) = match kind {
            FixtureKind::Job => ("full-time", "mid"),
            FixtureKind::Program => ("development", "beginner"),
        };
        Self {
            kind,
            id: Uuid::now_v7(),
            title: title.to_string(),
            description: format!("{title} description"),
            organization_id: "org-1".to_string(),
            organization_name: "Acme".to_string(),
            city: "Berlin".to_string(),
            country: "Germany".to_string(),
            skills: Vec::new(),
            tags: Vec::new(),
            category: category.to_string(),
            experience_level: level.to_string(),
            range_min: 0,
            views: 0,
            engagement: 0,
            featured: false,
            urgent: false,
            status: "active".to_string(),
            visibility: "public".to_string(),
            work_mode: "onsite".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Set the company (jobs) or provider (programs).
    pub fn with_company(mut self, id: &str, name: &str) -> Self {
        self.organization_id = id.to_string();
        self.organization_name = name.to_string();
        self
    }

    pub fn with_location(mut self, city: &str, country: &str) -> Self {
        self.city = city.to_string();
        self.country = country.to_string();
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the job type (jobs) or category (programs).
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_experience_level(mut self, level: &str) -> Self {
        self.experience_level = level.to_string();
        self
    }

    /// Set the salary lower bound (jobs) or price (programs).
    pub fn with_range_min(mut self, amount: i64) -> Self {
        self.range_min = amount;
        self
    }

    pub fn with_views(mut self, views: i64) -> Self {
        self.views = views;
        self
    }

    /// Set applications (jobs) or enrollments (programs).
    pub fn with_engagement(mut self, count: i64) -> Self {
        self.engagement = count;
        self
    }

    /// Set as featured.
    pub fn featured(mut self) -> Self {
        self.featured = true;
        self
    }

    /// Set as urgent.
    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    /// Set as closed.
    pub fn closed(mut self) -> Self {
        self.status = "closed".to_string();
        self
    }

    /// Set as private.
    pub fn private(mut self) -> Self {
        self.visibility = "private".to_string();
        self
    }

    pub fn remote(mut self) -> Self {
        self.work_mode = "remote".to_string();
        self
    }

    pub fn hybrid(mut self) -> Self {
        self.work_mode = "hybrid".to_string();
        self
    }

    /// Backdate creation.
    pub fn created_days_ago(mut self, days: i64) -> Self {
        self.created_at = Utc::now() - Duration::days(days);
        self
    }

    /// Render to the document layout of the fixture's kind.
    pub fn to_document(&self) -> JsonValue {
        let created_at = self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
        match self.kind {
            FixtureKind::Job => json!({
                "_id": self.id.to_string(),
                "title": self.title,
                "description": self.description,
                "company": { "id": self.organization_id, "name": self.organization_name },
                "location": { "city": self.city, "country": self.country },
                "requirements": { "skills": self.skills },
                "tags": self.tags,
                "jobType": self.category,
                "experienceLevel": self.experience_level,
                "salary": { "min": self.range_min },
                "status": self.status,
                "visibility": self.visibility,
                "createdAt": created_at,
                "analytics": {
                    "views": self.views,
                    "applications": self.engagement,
                    "shortlisted": 0,
                    "hired": 0
                },
                "isFeatured": self.featured,
                "isUrgent": self.urgent,
                "workMode": self.work_mode,
            }),
            FixtureKind::Program => json!({
                "_id": self.id.to_string(),
                "title": self.title,
                "description": self.description,
                "provider": { "id": self.organization_id, "name": self.organization_name },
                "location": { "city": self.city, "country": self.country },
                "skills": self.skills,
                "tags": self.tags,
                "category": self.category,
                "level": self.experience_level,
                "price": { "amount": self.range_min },
                "status": self.status,
                "visibility": self.visibility,
                "createdAt": created_at,
                "analytics": {
                    "views": self.views,
                    "enrollments": self.engagement,
                    "completions": 0
                },
                "isFeatured": self.featured,
                "isUrgent": self.urgent,
                "deliveryMode": self.work_mode,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn job_document_layout() {
        let doc = test_job("Rust Engineer")
            .with_company("org-9", "Initech")
            .with_skills(&["Rust"])
            .with_range_min(90_000)
            .remote()
            .to_document();
        assert_eq!(doc["company"]["name"], "Initech");
        assert_eq!(doc["requirements"]["skills"], json!(["Rust"]));
        assert_eq!(doc["salary"]["min"], 90_000);
        assert_eq!(doc["workMode"], "remote");
        assert_eq!(doc["status"], "active");
    }

    #[test]
    fn program_document_layout() {
        let doc = test_program("Intro to Go")
            .with_range_min(200)
            .with_engagement(12)
            .to_document();
        assert_eq!(doc["price"]["amount"], 200);
        assert_eq!(doc["analytics"]["enrollments"], 12);
        assert_eq!(doc["level"], "beginner");
    }

    #[test]
    fn ids_are_unique_and_backdating_orders() {
        let a = test_job("a").created_days_ago(2);
        let b = test_job("b");
        assert_ne!(a.id, b.id);
        let docs = documents(&[a, b]);
        assert!(docs[0]["createdAt"].as_str().unwrap() < docs[1]["createdAt"].as_str().unwrap());
    }
}
