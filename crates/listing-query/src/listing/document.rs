//! Document-store rendering.
//!
//! Translates predicates, sort keys and pipelines into the JSON operator
//! syntax of MongoDB-compatible document stores. Regex terms are escaped so
//! a user-supplied search is always matched literally.

use serde_json::{Map, Value, json};

use super::pipeline::{Accumulator, Expression, GroupKey, Pipeline, PipelineStage};
use super::predicate::Predicate;
use super::sort::SortKey;
use super::types::PaginationSpec;

/// Prefix of the temporary fields holding stream-wide sums.
const TOTAL_FIELD_PREFIX: &str = "__total_";

/// Render a predicate as a query filter document.
pub fn predicate_document(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::Equals { field, value } => single(field, value.to_json()),
        // no bounds, no constraint
        Predicate::Range {
            min: None,
            max: None,
            ..
        } => json!({}),
        Predicate::Range { field, min, max } => {
            let mut bounds = Map::new();
            if let Some(min) = min {
                bounds.insert("$gte".into(), json!(min));
            }
            if let Some(max) = max {
                bounds.insert("$lte".into(), json!(max));
            }
            single(field, Value::Object(bounds))
        }
        Predicate::RegexOr { fields, term } => {
            let pattern = regex::escape(term);
            let clauses: Vec<Value> = fields
                .iter()
                .map(|f| single(f, json!({"$regex": pattern, "$options": "i"})))
                .collect();
            json!({ "$or": clauses })
        }
        Predicate::In { field, values } => {
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            single(field, json!({ "$in": values }))
        }
        Predicate::Conjunction { children } if children.is_empty() => json!({}),
        Predicate::Conjunction { children } => {
            json!({ "$and": children.iter().map(predicate_document).collect::<Vec<_>>() })
        }
        Predicate::Disjunction { children } if children.is_empty() => json!({ "$expr": false }),
        Predicate::Disjunction { children } => {
            json!({ "$or": children.iter().map(predicate_document).collect::<Vec<_>>() })
        }
    }
}

/// Render a predicate as an aggregation expression (for `$cond` and
/// friends), where fields are referenced as `"$path"`.
pub fn predicate_expression(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::Equals { field, value } => json!({ "$eq": [reference(field), value.to_json()] }),
        Predicate::Range { field, min, max } => {
            let mut clauses = Vec::new();
            if let Some(min) = min {
                clauses.push(json!({ "$gte": [reference(field), min] }));
            }
            if let Some(max) = max {
                clauses.push(json!({ "$lte": [reference(field), max] }));
            }
            json!({ "$and": clauses })
        }
        Predicate::RegexOr { fields, term } => {
            let pattern = regex::escape(term);
            let clauses: Vec<Value> = fields
                .iter()
                .map(|f| {
                    json!({ "$regexMatch": {
                        "input": reference(f),
                        "regex": pattern,
                        "options": "i"
                    }})
                })
                .collect();
            json!({ "$or": clauses })
        }
        Predicate::In { field, values } => {
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            json!({ "$in": [reference(field), values] })
        }
        Predicate::Conjunction { children } if children.is_empty() => Value::Bool(true),
        Predicate::Conjunction { children } => {
            json!({ "$and": children.iter().map(predicate_expression).collect::<Vec<_>>() })
        }
        Predicate::Disjunction { children } if children.is_empty() => Value::Bool(false),
        Predicate::Disjunction { children } => {
            json!({ "$or": children.iter().map(predicate_expression).collect::<Vec<_>>() })
        }
    }
}

/// Render a sort key as `{ field: 1 | -1 }`.
pub fn sort_document(sort: &SortKey) -> Value {
    single(&sort.field, json!(sort.direction.signum()))
}

/// Render a paged listing query as `{filter, sort, skip, limit}`.
pub fn find_document(
    predicate: &Predicate,
    sort: &SortKey,
    pagination: &PaginationSpec,
) -> Value {
    json!({
        "filter": predicate_document(predicate),
        "sort": sort_document(sort),
        "skip": pagination.skip(),
        "limit": pagination.limit(),
    })
}

/// Render a pipeline as an array of stage documents.
///
/// A computed field that needs a stream-wide sum expands to
/// `$setWindowFields` → `$addFields` → `$unset`; every other stage maps to
/// exactly one document.
pub fn pipeline_documents(pipeline: &Pipeline) -> Vec<Value> {
    let mut out = Vec::with_capacity(pipeline.len());
    for stage in pipeline.stages() {
        match stage {
            PipelineStage::Match(predicate) => {
                out.push(json!({ "$match": predicate_document(predicate) }));
            }
            PipelineStage::Unwind(path) => out.push(json!({ "$unwind": reference(path) })),
            PipelineStage::Group { key, aggregations } => {
                let mut group = Map::new();
                group.insert("_id".into(), group_id(key));
                for aggregation in aggregations {
                    group.insert(
                        aggregation.name.clone(),
                        accumulator_document(&aggregation.accumulator),
                    );
                }
                out.push(json!({ "$group": group }));
            }
            PipelineStage::AddField { name, expression } => {
                let totals = expression.total_sum_fields();
                if !totals.is_empty() {
                    let mut output = Map::new();
                    for field in &totals {
                        output.insert(total_field(field), json!({ "$sum": reference(field) }));
                    }
                    out.push(json!({ "$setWindowFields": { "output": output } }));
                }
                out.push(json!({ "$addFields": single(name, expression_document(expression)) }));
                if !totals.is_empty() {
                    let unset: Vec<String> = totals.iter().map(|f| total_field(f)).collect();
                    out.push(json!({ "$unset": unset }));
                }
            }
            PipelineStage::Sort { field, direction } => {
                out.push(json!({ "$sort": single(field, json!(direction.signum())) }));
            }
            PipelineStage::Limit(n) => out.push(json!({ "$limit": n })),
        }
    }
    out
}

fn group_id(key: &GroupKey) -> Value {
    match key {
        GroupKey::None => Value::Null,
        GroupKey::Field(path) => reference(path),
        GroupKey::Compound(parts) => {
            let mut id = Map::new();
            for part in parts {
                id.insert(part.name.clone(), reference(&part.path));
            }
            Value::Object(id)
        }
    }
}

fn accumulator_document(accumulator: &Accumulator) -> Value {
    match accumulator {
        Accumulator::Count => json!({ "$sum": 1 }),
        Accumulator::Sum(path) => json!({ "$sum": reference(path) }),
        Accumulator::Avg(path) => json!({ "$avg": reference(path) }),
        Accumulator::CountWhere(predicate) => {
            json!({ "$sum": { "$cond": [predicate_expression(predicate), 1, 0] } })
        }
        Accumulator::AddToSet(path) => json!({ "$addToSet": reference(path) }),
    }
}

fn expression_document(expression: &Expression) -> Value {
    match expression {
        Expression::Field(field) => reference(field),
        Expression::Number(n) => json!(n),
        Expression::GroupSum(field) => json!({ "$sum": reference(field) }),
        Expression::TotalSum(field) => reference(&total_field(field)),
        Expression::Divide(lhs, rhs) => {
            let rhs = expression_document(rhs);
            json!({ "$cond": [
                { "$eq": [rhs, 0] },
                null,
                { "$divide": [expression_document(lhs), rhs] }
            ]})
        }
        Expression::Multiply(lhs, rhs) => {
            json!({ "$multiply": [expression_document(lhs), expression_document(rhs)] })
        }
    }
}

fn total_field(field: &str) -> String {
    format!("{TOTAL_FIELD_PREFIX}{}", field.replace('.', "_"))
}

fn reference(path: &str) -> Value {
    Value::String(format!("${path}"))
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::listing::fields::ListingKind;
    use crate::listing::pipeline::{PercentagePolicy, PipelineBuilder};
    use crate::listing::types::SortDirection;

    #[test]
    fn leaves() {
        assert_eq!(
            predicate_document(&Predicate::range("salary.min", Some(100_000), None)),
            json!({"salary.min": {"$gte": 100_000}})
        );
        assert_eq!(
            predicate_document(&Predicate::is_in("tags", ["remote"])),
            json!({"tags": {"$in": ["remote"]}})
        );
        assert_eq!(
            predicate_document(&Predicate::equals("status", "active")),
            json!({"status": "active"})
        );
    }

    #[test]
    fn unbounded_range_matches_everything() {
        let unbounded = Predicate::range("salary.min", None, None);
        assert_eq!(predicate_document(&unbounded), json!({}));
        assert_eq!(
            predicate_document(&Predicate::and(vec![
                unbounded,
                Predicate::equals("status", "active"),
            ])),
            json!({"$and": [{}, {"status": "active"}]})
        );
    }

    #[test]
    fn regex_terms_are_escaped() {
        let doc = predicate_document(&Predicate::regex_or(&["title"], "c++ (senior)"));
        assert_eq!(
            doc,
            json!({"$or": [{"title": {"$regex": r"c\+\+ \(senior\)", "$options": "i"}}]})
        );
    }

    #[test]
    fn empty_connectives() {
        assert_eq!(predicate_document(&Predicate::and(vec![])), json!({}));
        assert_eq!(
            predicate_document(&Predicate::or(vec![])),
            json!({"$expr": false})
        );
        assert_eq!(predicate_expression(&Predicate::and(vec![])), json!(true));
    }

    #[test]
    fn sort_uses_signum() {
        assert_eq!(
            sort_document(&SortKey::new("salary.min", SortDirection::Desc)),
            json!({"salary.min": -1})
        );
    }

    #[test]
    fn find_document_pages() {
        let doc = find_document(
            &Predicate::and(vec![]),
            &SortKey::default(),
            &PaginationSpec::new(3, 20).unwrap(),
        );
        assert_eq!(doc["skip"], json!(40));
        assert_eq!(doc["limit"], json!(20));
        assert_eq!(doc["sort"], json!({"createdAt": -1}));
    }

    #[test]
    fn company_pipeline() {
        let pipeline = PipelineBuilder::new(ListingKind::Job)
            .by_company(None)
            .unwrap();
        let docs = pipeline_documents(&pipeline);
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[1]["$group"]["_id"], json!("$company.name"));
        assert_eq!(docs[1]["$group"]["jobCount"], json!({"$sum": 1}));
        assert_eq!(
            docs[1]["$group"]["activeJobs"],
            json!({"$sum": {"$cond": [{"$eq": ["$status", "active"]}, 1, 0]}})
        );
        assert_eq!(docs[2], json!({"$sort": {"jobCount": -1}}));
        assert_eq!(docs[3], json!({"$limit": 10}));
    }

    #[test]
    fn statistics_group_has_null_key() {
        let pipeline = PipelineBuilder::new(ListingKind::Job)
            .statistics(None)
            .unwrap();
        let docs = pipeline_documents(&pipeline);
        assert_eq!(docs[1]["$group"]["_id"], Value::Null);
        assert_eq!(docs[1]["$group"]["avgSalary"], json!({"$avg": "$salary.min"}));
    }

    #[test]
    fn skill_percentage_per_policy() {
        let grand = PipelineBuilder::new(ListingKind::Job)
            .by_skill(None)
            .unwrap();
        let docs = pipeline_documents(&grand);
        let names: Vec<&str> = docs
            .iter()
            .map(|d| d.as_object().unwrap().keys().next().unwrap().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "$match",
                "$unwind",
                "$group",
                "$setWindowFields",
                "$addFields",
                "$unset",
                "$sort",
                "$limit"
            ]
        );
        assert_eq!(
            docs[3],
            json!({"$setWindowFields": {"output": {"__total_count": {"$sum": "$count"}}}})
        );

        let legacy = PipelineBuilder::new(ListingKind::Job)
            .with_percentage_policy(PercentagePolicy::PerGroup)
            .by_skill(None)
            .unwrap();
        let docs = pipeline_documents(&legacy);
        assert_eq!(docs.len(), 6);
        let percentage = &docs[3]["$addFields"]["percentage"];
        assert_eq!(
            percentage["$multiply"][0]["$cond"][2],
            json!({"$divide": ["$count", {"$sum": "$count"}]})
        );
    }
}
