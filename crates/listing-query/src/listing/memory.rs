//! In-memory reference executor.
//!
//! Evaluates predicates and pipelines over `serde_json::Value` documents
//! with the same semantics the document adapter asks of a real store:
//! array fields match when any element matches, regex terms are literal
//! case-insensitive substrings, and missing fields never match.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};

use super::pipeline::{Accumulator, Aggregation, Expression, GroupKey, Pipeline, PipelineStage};
use super::predicate::{FieldValue, Predicate};
use super::sort::SortKey;
use super::types::{Page, PaginationSpec, SortDirection};

/// Value at a dot-separated path. Numeric segments index into arrays.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set the value at a dot-separated path, creating objects as needed.
pub fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Whether `doc` satisfies `predicate`.
pub fn matches(predicate: &Predicate, doc: &Value) -> bool {
    match predicate {
        Predicate::Equals { field, value } => {
            any_element(lookup(doc, field), |v| value_equals(v, value))
        }
        Predicate::Range {
            min: None,
            max: None,
            ..
        } => true,
        Predicate::Range { field, min, max } => any_element(lookup(doc, field), |v| {
            v.as_f64().is_some_and(|n| {
                min.is_none_or(|min| n >= min as f64) && max.is_none_or(|max| n <= max as f64)
            })
        }),
        Predicate::RegexOr { fields, term } => {
            let needle = term.to_lowercase();
            fields.iter().any(|field| {
                any_element(lookup(doc, field), |v| {
                    v.as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
                })
            })
        }
        Predicate::In { field, values } => any_element(lookup(doc, field), |v| {
            values.iter().any(|candidate| value_equals(v, candidate))
        }),
        Predicate::Conjunction { children } => children.iter().all(|c| matches(c, doc)),
        Predicate::Disjunction { children } => children.iter().any(|c| matches(c, doc)),
    }
}

fn any_element(value: Option<&Value>, test: impl Fn(&Value) -> bool) -> bool {
    match value {
        None => false,
        Some(Value::Array(items)) => items.iter().any(test),
        Some(v) => test(v),
    }
}

fn value_equals(actual: &Value, expected: &FieldValue) -> bool {
    match (actual, expected) {
        (Value::String(a), FieldValue::String(e)) => a == e,
        (Value::Bool(a), FieldValue::Boolean(e)) => a == e,
        (Value::Number(a), FieldValue::Integer(e)) => a.as_f64() == Some(*e as f64),
        (Value::Number(a), FieldValue::Float(e)) => a.as_f64() == Some(*e),
        _ => false,
    }
}

/// Number of documents matching `predicate`.
pub fn count(docs: &[Value], predicate: &Predicate) -> u64 {
    docs.iter().filter(|d| matches(predicate, d)).count() as u64
}

/// Filter, sort and page `docs` the way a listing endpoint would.
pub fn select(
    docs: &[Value],
    predicate: &Predicate,
    sort: &SortKey,
    pagination: &PaginationSpec,
) -> Page<Value> {
    let mut matched: Vec<&Value> = docs.iter().filter(|d| matches(predicate, d)).collect();
    let total = matched.len() as u64;
    matched.sort_by(|a, b| compare_at(a, b, &sort.field, sort.direction));

    let skip = usize::try_from(pagination.skip()).unwrap_or(usize::MAX);
    let items: Vec<Value> = matched
        .into_iter()
        .skip(skip)
        .take(pagination.limit() as usize)
        .cloned()
        .collect();

    tracing::trace!(total, returned = items.len(), "selected listings");
    Page::new(items, total, pagination)
}

/// Run `pipeline` over `docs` and return the output rows.
pub fn execute(pipeline: &Pipeline, docs: &[Value]) -> Vec<Value> {
    let mut rows = docs.to_vec();
    for stage in pipeline.stages() {
        rows = match stage {
            PipelineStage::Match(predicate) => {
                rows.retain(|row| matches(predicate, row));
                rows
            }
            PipelineStage::Unwind(path) => unwind(rows, path),
            PipelineStage::Group { key, aggregations } => group(&rows, key, aggregations),
            PipelineStage::AddField { name, expression } => {
                add_field(&mut rows, name, expression);
                rows
            }
            PipelineStage::Sort { field, direction } => {
                rows.sort_by(|a, b| compare_at(a, b, field, *direction));
                rows
            }
            PipelineStage::Limit(n) => {
                rows.truncate(*n);
                rows
            }
        };
        tracing::trace!(rows = rows.len(), ?stage, "executed stage");
    }
    rows
}

fn unwind(rows: Vec<Value>, path: &str) -> Vec<Value> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match lookup(&row, path).cloned() {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    let mut copy = row.clone();
                    set_path(&mut copy, path, item);
                    out.push(copy);
                }
            }
            Some(_) => out.push(row),
        }
    }
    out
}

fn group(rows: &[Value], key: &GroupKey, aggregations: &[Aggregation]) -> Vec<Value> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Value, Vec<&Value>)> = Vec::new();

    for row in rows {
        let id = group_id(row, key);
        let slot = *index.entry(id.to_string()).or_insert_with(|| {
            groups.push((id.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(row);
    }

    groups
        .into_iter()
        .map(|(id, members)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), id);
            for aggregation in aggregations {
                out.insert(
                    aggregation.name.clone(),
                    accumulate(&aggregation.accumulator, &members),
                );
            }
            Value::Object(out)
        })
        .collect()
}

fn group_id(row: &Value, key: &GroupKey) -> Value {
    match key {
        GroupKey::None => Value::Null,
        GroupKey::Field(path) => lookup(row, path).cloned().unwrap_or(Value::Null),
        GroupKey::Compound(parts) => {
            let mut id = Map::new();
            for part in parts {
                id.insert(
                    part.name.clone(),
                    lookup(row, &part.path).cloned().unwrap_or(Value::Null),
                );
            }
            Value::Object(id)
        }
    }
}

fn accumulate(accumulator: &Accumulator, members: &[&Value]) -> Value {
    match accumulator {
        Accumulator::Count => Value::from(members.len() as u64),
        Accumulator::Sum(path) => {
            let values: Vec<&Value> = members
                .iter()
                .filter_map(|m| lookup(m, path))
                .filter(|v| v.is_number())
                .collect();
            sum_numbers(&values)
        }
        Accumulator::Avg(path) => {
            let values: Vec<f64> = members
                .iter()
                .filter_map(|m| lookup(m, path).and_then(Value::as_f64))
                .collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::from(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Accumulator::CountWhere(predicate) => {
            Value::from(members.iter().filter(|m| matches(predicate, m)).count() as u64)
        }
        Accumulator::AddToSet(path) => {
            let mut set: Vec<Value> = Vec::new();
            for value in members.iter().filter_map(|m| lookup(m, path)) {
                if !set.contains(value) {
                    set.push(value.clone());
                }
            }
            Value::Array(set)
        }
    }
}

/// Integer sum when every value is an integer, float otherwise.
fn sum_numbers(values: &[&Value]) -> Value {
    let integers: Option<i64> = values
        .iter()
        .try_fold(0i64, |acc, v| v.as_i64().and_then(|n| acc.checked_add(n)));
    match integers {
        Some(total) => Value::from(total),
        None => Value::from(values.iter().filter_map(|v| v.as_f64()).sum::<f64>()),
    }
}

fn add_field(rows: &mut [Value], name: &str, expression: &Expression) {
    let totals: HashMap<&str, f64> = expression
        .total_sum_fields()
        .into_iter()
        .map(|field| {
            let total = rows
                .iter()
                .filter_map(|row| lookup(row, field).and_then(Value::as_f64))
                .sum();
            (field, total)
        })
        .collect();

    for row in rows.iter_mut() {
        let value = evaluate(expression, row, &totals).map_or(Value::Null, Value::from);
        set_path(row, name, value);
    }
}

fn evaluate(expression: &Expression, row: &Value, totals: &HashMap<&str, f64>) -> Option<f64> {
    match expression {
        Expression::Field(field) => lookup(row, field).and_then(Value::as_f64),
        Expression::Number(n) => Some(*n),
        Expression::GroupSum(field) => match lookup(row, field)? {
            Value::Array(items) => Some(items.iter().filter_map(Value::as_f64).sum()),
            other => other.as_f64(),
        },
        Expression::TotalSum(field) => totals.get(field.as_str()).copied(),
        Expression::Divide(lhs, rhs) => {
            let denominator = evaluate(rhs, row, totals)?;
            if denominator == 0.0 {
                return None;
            }
            Some(evaluate(lhs, row, totals)? / denominator)
        }
        Expression::Multiply(lhs, rhs) => {
            Some(evaluate(lhs, row, totals)? * evaluate(rhs, row, totals)?)
        }
    }
}

fn compare_at(a: &Value, b: &Value, path: &str, direction: SortDirection) -> Ordering {
    let ordering = compare_values(lookup(a, path), lookup(b, path));
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Cross-type order: missing/null, numbers, strings, objects, arrays, booleans.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Object(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Bool(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_and_set_nested_paths() {
        let mut doc = json!({"company": {"name": "Acme"}, "skills": ["go", "rust"]});
        assert_eq!(lookup(&doc, "company.name"), Some(&json!("Acme")));
        assert_eq!(lookup(&doc, "skills.1"), Some(&json!("rust")));
        assert_eq!(lookup(&doc, "company.id"), None);

        set_path(&mut doc, "analytics.views", json!(3));
        assert_eq!(doc["analytics"]["views"], json!(3));
    }

    #[test]
    fn predicates_on_arrays_and_scalars() {
        let doc = json!({
            "title": "Senior Rust Engineer",
            "tags": ["remote", "visa"],
            "salary": {"min": 90_000},
            "isFeatured": true
        });
        assert!(matches(&Predicate::equals("tags", "visa"), &doc));
        assert!(matches(&Predicate::is_in("tags", ["onsite", "remote"]), &doc));
        assert!(matches(&Predicate::regex_or(&["title"], "rust eng"), &doc));
        assert!(matches(&Predicate::range("salary.min", Some(90_000), None), &doc));
        assert!(!matches(&Predicate::range("salary.min", None, Some(80_000)), &doc));
        assert!(matches(&Predicate::equals("isFeatured", true), &doc));
        assert!(!matches(&Predicate::equals("missing", "x"), &doc));
    }

    #[test]
    fn regex_terms_match_literally() {
        let doc = json!({"title": "C++ Developer"});
        assert!(matches(&Predicate::regex_or(&["title"], "c++"), &doc));
        assert!(!matches(&Predicate::regex_or(&["title"], "c.+"), &doc));
    }

    #[test]
    fn empty_connectives() {
        let doc = json!({});
        assert!(matches(&Predicate::and(vec![]), &doc));
        assert!(!matches(&Predicate::or(vec![]), &doc));
    }

    #[test]
    fn unbounded_range_matches_missing_fields() {
        let unbounded = Predicate::range("salary.min", None, None);
        assert!(matches(&unbounded, &json!({})));
        assert!(matches(&unbounded, &json!({"salary": {"min": "n/a"}})));
    }

    #[test]
    fn unwind_drops_missing_and_empty() {
        let rows = vec![
            json!({"_id": 1, "skills": ["a", "b"]}),
            json!({"_id": 2, "skills": []}),
            json!({"_id": 3}),
        ];
        let out = unwind(rows, "skills");
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], json!({"_id": 1, "skills": "b"}));
    }

    #[test]
    fn sums_stay_integral() {
        let a = json!(2);
        let b = json!(3);
        let c = json!(0.5);
        assert_eq!(sum_numbers(&[&a, &b]), json!(5));
        assert_eq!(sum_numbers(&[&a, &c]), json!(2.5));
        assert_eq!(sum_numbers(&[]), json!(0));
    }

    #[test]
    fn value_order_across_types() {
        let mut values = vec![json!("b"), json!(true), json!(2), Value::Null, json!(1)];
        values.sort_by(|a, b| compare_values(Some(a), Some(b)));
        assert_eq!(values, vec![Value::Null, json!(1), json!(2), json!("b"), json!(true)]);
    }
}
