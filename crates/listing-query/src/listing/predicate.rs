//! Engine-agnostic predicate tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar value compared against a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    /// JSON form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Boolean(b) => Value::Bool(*b),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// A filter condition, or a conjunction/disjunction of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals value (any element, for array fields).
    Equals { field: String, value: FieldValue },

    /// Numeric field within inclusive bounds; a missing bound is unbounded.
    Range {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },

    /// Case-insensitive substring match of `term` on any of `fields`.
    RegexOr { fields: Vec<String>, term: String },

    /// Field equals one of the values.
    In {
        field: String,
        values: Vec<FieldValue>,
    },

    /// All children hold. Empty matches everything.
    Conjunction { children: Vec<Predicate> },

    /// Any child holds. Empty matches nothing.
    Disjunction { children: Vec<Predicate> },
}

impl Predicate {
    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Predicate::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn range(field: &str, min: Option<i64>, max: Option<i64>) -> Self {
        Predicate::Range {
            field: field.to_string(),
            min,
            max,
        }
    }

    pub fn regex_or<S: AsRef<str>>(fields: &[S], term: &str) -> Self {
        Predicate::RegexOr {
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            term: term.to_string(),
        }
    }

    pub fn is_in<V: Into<FieldValue>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::Conjunction { children }
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Disjunction { children }
    }

    /// Direct children of a conjunction or disjunction; empty for leaves.
    pub fn children(&self) -> &[Predicate] {
        match self {
            Predicate::Conjunction { children } | Predicate::Disjunction { children } => children,
            _ => &[],
        }
    }

    /// Every field path referenced by this predicate, in tree order.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Equals { field, .. }
            | Predicate::Range { field, .. }
            | Predicate::In { field, .. } => out.push(field),
            Predicate::RegexOr { fields, .. } => out.extend(fields.iter().map(String::as_str)),
            Predicate::Conjunction { children } | Predicate::Disjunction { children } => {
                for child in children {
                    child.collect_fields(out);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_operator_tag() {
        let p = Predicate::and(vec![
            Predicate::range("salary.min", Some(100), None),
            Predicate::equals("status", "active"),
        ]);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json,
            json!({
                "op": "conjunction",
                "children": [
                    {"op": "range", "field": "salary.min", "min": 100},
                    {"op": "equals", "field": "status", "value": "active"}
                ]
            })
        );

        let parsed: Predicate = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn field_value_untagged() {
        let v: FieldValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, FieldValue::Integer(42));
        let v: FieldValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, FieldValue::Boolean(true));
        assert_eq!(FieldValue::from("x").to_json(), json!("x"));
    }

    #[test]
    fn collects_fields_in_order() {
        let p = Predicate::and(vec![
            Predicate::regex_or(&["title", "description"], "rust"),
            Predicate::or(vec![Predicate::is_in("tags", ["a", "b"])]),
        ]);
        assert_eq!(p.fields(), vec!["title", "description", "tags"]);
        assert_eq!(p.children().len(), 2);
    }
}
