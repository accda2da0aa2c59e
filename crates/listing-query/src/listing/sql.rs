//! PostgreSQL rendering using SeaQuery.
//!
//! Listings are stored as JSONB documents in a single column. Document
//! paths become JSONB path extractions:
//! - `company.name` → `(listing.doc->'company'->>'name')` for text
//! - array fields (skills, tags) are matched with containment or
//!   `jsonb_array_elements_text`
//! - LIKE wildcards in search terms are escaped
//!
//! The table is always aliased as `listing`, so paths stay valid for
//! schema-qualified and mixed-case table names.

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr,
};

use super::fields::ListingKind;
use super::predicate::{FieldValue, Predicate};
use super::sort::SortKey;
use super::types::{PaginationSpec, SortDirection};

/// Default table holding listing documents.
pub const DEFAULT_TABLE: &str = "listing";

/// Default JSONB column holding the document.
pub const DEFAULT_COLUMN: &str = "doc";

/// Alias every query gives the listing table.
pub const TABLE_ALIAS: &str = "listing";

/// SQL builder for one listing kind.
#[derive(Debug, Clone)]
pub struct ListingSqlBuilder {
    table: String,
    column: String,
    array_fields: Vec<String>,
}

impl ListingSqlBuilder {
    /// Builder over the default table with the kind's array fields.
    pub fn for_kind(kind: ListingKind) -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            column: DEFAULT_COLUMN.to_string(),
            array_fields: kind
                .fields()
                .array_fields()
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }

    /// Table to read from, optionally schema-qualified (`schema.table`).
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Build the paged SELECT.
    pub fn build(
        &self,
        predicate: &Predicate,
        sort: &SortKey,
        pagination: &PaginationSpec,
    ) -> String {
        let mut query = Query::select();

        query.column((Alias::new(TABLE_ALIAS), Asterisk));
        self.from_table(&mut query);
        query.and_where(self.condition(predicate));

        // jsonb ordering keeps numbers numeric
        let order = match sort.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        query.order_by_expr(Expr::cust(self.json_path(&sort.field)), order);

        query.limit(u64::from(pagination.limit()));
        query.offset(pagination.skip());

        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query for total results.
    pub fn build_count(&self, predicate: &Predicate) -> String {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        self.from_table(&mut query);
        query.and_where(self.condition(predicate));
        query.to_string(PostgresQueryBuilder)
    }

    /// Build the WHERE expression for a predicate.
    pub fn condition(&self, predicate: &Predicate) -> SimpleExpr {
        match predicate {
            Predicate::Equals { field, value } if self.is_array(field) => {
                self.contains_element(field, value)
            }
            Predicate::Equals { field, value } => {
                self.typed_expr(field, value).eq(sql_value(value))
            }
            Predicate::Range {
                min: None,
                max: None,
                ..
            } => Expr::cust("TRUE"),
            Predicate::Range { field, min, max } => {
                let numeric = Expr::cust(format!("({})::numeric", self.text_path(field)));
                let mut cond = Cond::all();
                if let Some(min) = min {
                    cond = cond.add(numeric.clone().gte(*min));
                }
                if let Some(max) = max {
                    cond = cond.add(numeric.lte(*max));
                }
                cond.into()
            }
            Predicate::RegexOr { fields, term } => {
                let pattern = format!("%{}%", escape_like_wildcards(term));
                let mut cond = Cond::any();
                for field in fields {
                    cond = cond.add(self.ilike(field, &pattern));
                }
                cond.into()
            }
            Predicate::In { field, values } => {
                if values.is_empty() {
                    return Expr::cust("FALSE");
                }
                if self.is_array(field) {
                    let mut cond = Cond::any();
                    for value in values {
                        cond = cond.add(self.contains_element(field, value));
                    }
                    cond.into()
                } else {
                    let texts: Vec<String> = values.iter().map(text_value).collect();
                    Expr::cust(self.text_path(field)).is_in(texts)
                }
            }
            Predicate::Conjunction { children } => {
                if children.is_empty() {
                    return Expr::cust("TRUE");
                }
                let mut cond = Cond::all();
                for child in children {
                    cond = cond.add(self.condition(child));
                }
                cond.into()
            }
            Predicate::Disjunction { children } => {
                if children.is_empty() {
                    return Expr::cust("FALSE");
                }
                let mut cond = Cond::any();
                for child in children {
                    cond = cond.add(self.condition(child));
                }
                cond.into()
            }
        }
    }

    fn from_table(&self, query: &mut SelectStatement) {
        let alias = Alias::new(TABLE_ALIAS);
        match self.table.split_once('.') {
            Some((schema, table)) => query.from_as((Alias::new(schema), Alias::new(table)), alias),
            None => query.from_as(Alias::new(&self.table), alias),
        };
    }

    fn is_array(&self, field: &str) -> bool {
        self.array_fields.iter().any(|f| f == field)
    }

    fn ilike(&self, field: &str, pattern: &str) -> SimpleExpr {
        if self.is_array(field) {
            Expr::cust_with_values(
                format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements_text({}) AS elem WHERE elem ILIKE $1)",
                    self.json_path(field)
                ),
                [pattern.to_string()],
            )
        } else {
            Expr::cust_with_values(
                format!("{} ILIKE $1", self.text_path(field)),
                [pattern.to_string()],
            )
        }
    }

    fn contains_element(&self, field: &str, value: &FieldValue) -> SimpleExpr {
        let element = serde_json::Value::Array(vec![value.to_json()]).to_string();
        Expr::cust_with_values(format!("{} @> $1::jsonb", self.json_path(field)), [element])
    }

    /// Text extraction cast to the value's type.
    fn typed_expr(&self, field: &str, value: &FieldValue) -> SimpleExpr {
        let text = self.text_path(field);
        match value {
            FieldValue::String(_) => Expr::cust(text),
            FieldValue::Integer(_) => Expr::cust(format!("({text})::bigint")),
            FieldValue::Float(_) => Expr::cust(format!("({text})::double precision")),
            FieldValue::Boolean(_) => Expr::cust(format!("({text})::boolean")),
        }
    }

    /// `(listing.column->'a'->>'b')`
    fn text_path(&self, path: &str) -> String {
        self.path_expr(path, "->>")
    }

    /// `(listing.column->'a'->'b')`
    fn json_path(&self, path: &str) -> String {
        self.path_expr(path, "->")
    }

    fn path_expr(&self, path: &str, last: &str) -> String {
        let parts: Vec<&str> = path.split('.').collect();
        let mut expr = format!("{TABLE_ALIAS}.{}", identifier(&self.column));
        for (i, part) in parts.iter().enumerate() {
            let op = if i == parts.len() - 1 { last } else { "->" };
            expr.push_str(&format!("{op}'{}'", part.replace('\'', "''")));
        }
        format!("({expr})")
    }
}

/// Build the paged SELECT for `kind` over the default table.
pub fn build_select(
    kind: ListingKind,
    predicate: &Predicate,
    sort: &SortKey,
    pagination: &PaginationSpec,
) -> String {
    ListingSqlBuilder::for_kind(kind).build(predicate, sort, pagination)
}

/// Quote an identifier unless Postgres would read it unchanged.
fn identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn sql_value(value: &FieldValue) -> sea_query::Value {
    match value {
        FieldValue::String(s) => s.clone().into(),
        FieldValue::Integer(i) => (*i).into(),
        FieldValue::Float(f) => (*f).into(),
        FieldValue::Boolean(b) => (*b).into(),
    }
}

fn text_value(value: &FieldValue) -> String {
    match value {
        FieldValue::String(s) => s.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::listing::query_builder::{QueryOptions, build_filter_predicate};
    use crate::listing::types::FilterSpec;

    fn job_sql(filters: &FilterSpec) -> String {
        let predicate =
            build_filter_predicate(ListingKind::Job, Some(filters), &QueryOptions::default())
                .unwrap();
        build_select(
            ListingKind::Job,
            &predicate,
            &SortKey::default(),
            &PaginationSpec::default(),
        )
    }

    fn where_sql(builder: &ListingSqlBuilder, predicate: &Predicate) -> String {
        Query::select()
            .column(Asterisk)
            .from(Alias::new("listing"))
            .and_where(builder.condition(predicate))
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn default_scope_query() {
        let sql = job_sql(&FilterSpec::default());
        assert!(sql.starts_with(r#"SELECT "listing".* FROM "listing" AS "listing" WHERE "#));
        assert!(sql.contains("((listing.doc->>'status')) = 'active'"));
        assert!(sql.contains("((listing.doc->>'visibility')) = 'public'"));
        assert!(sql.contains("ORDER BY (listing.doc->'createdAt') DESC"));
        assert!(sql.ends_with("LIMIT 10 OFFSET 0"));
    }

    #[test]
    fn nested_paths_and_ranges() {
        let sql = job_sql(&FilterSpec::default().with_range("50000-80000"));
        assert!(sql.contains("(((listing.doc->'salary'->>'min'))::numeric) >= 50000"));
        assert!(sql.contains("(((listing.doc->'salary'->>'min'))::numeric) <= 80000"));
    }

    #[test]
    fn unbounded_range_is_true() {
        let builder = ListingSqlBuilder::for_kind(ListingKind::Job);
        let sql = where_sql(&builder, &Predicate::range("salary.min", None, None));
        assert!(sql.ends_with("WHERE TRUE"));
    }

    #[test]
    fn search_uses_ilike_and_array_elements() {
        let sql = job_sql(&FilterSpec::default().with_search("engineer"));
        assert!(sql.contains("(listing.doc->>'title') ILIKE '%engineer%'"));
        assert!(
            sql.contains("jsonb_array_elements_text((listing.doc->'requirements'->'skills'))")
        );
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn tags_use_containment() {
        let sql = job_sql(&FilterSpec::default().with_tags(&["remote"]));
        assert!(sql.contains("(listing.doc->'tags') @> "));
        assert!(sql.contains("remote"));
        assert!(sql.contains("::jsonb"));
    }

    #[test]
    fn like_wildcards_escaped() {
        let sql = job_sql(&FilterSpec::default().with_search("100%"));
        assert!(sql.contains("100\\\\%"));
        assert_eq!(escape_like_wildcards("a_b"), "a\\_b");
        assert_eq!(escape_like_wildcards("a\\b"), "a\\\\b");
    }

    #[test]
    fn quotes_in_paths_escaped() {
        let builder = ListingSqlBuilder::for_kind(ListingKind::Job);
        assert_eq!(builder.text_path("o'neil"), "(listing.doc->>'o''neil')");
    }

    #[test]
    fn count_query_has_no_paging() {
        let builder = ListingSqlBuilder::for_kind(ListingKind::Job).with_table("jobs");
        let sql = builder.build_count(&Predicate::and(vec![]));
        assert_eq!(sql, r#"SELECT COUNT(*) FROM "jobs" AS "listing" WHERE TRUE"#);
    }

    #[test]
    fn schema_qualified_mixed_case_table() {
        let builder = ListingSqlBuilder::for_kind(ListingKind::Job)
            .with_table("public.Listings")
            .with_column("Doc");
        let sql = builder.build_count(&Predicate::equals("status", "active"));
        assert_eq!(
            sql,
            r#"SELECT COUNT(*) FROM "public"."Listings" AS "listing" WHERE ((listing."Doc"->>'status')) = 'active'"#
        );
        assert!(!sql.contains("Listings.doc"));
    }

    #[test]
    fn identifiers_quoted_only_when_needed() {
        assert_eq!(identifier("doc"), "doc");
        assert_eq!(identifier("doc_v2"), "doc_v2");
        assert_eq!(identifier("Doc"), "\"Doc\"");
        assert_eq!(identifier("2doc"), "\"2doc\"");
        assert_eq!(identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn pagination_offset() {
        let sql = build_select(
            ListingKind::Program,
            &Predicate::and(vec![]),
            &SortKey::new("price.amount", SortDirection::Asc),
            &PaginationSpec::new(2, 10).unwrap(),
        );
        assert!(sql.contains("OFFSET 10"));
        assert!(sql.contains("ORDER BY (listing.doc->'price'->'amount') ASC"));
    }

    #[test]
    fn boolean_equality_is_cast() {
        let builder = ListingSqlBuilder::for_kind(ListingKind::Job);
        let sql = where_sql(&builder, &Predicate::equals("isFeatured", true));
        assert!(sql.contains("(((listing.doc->>'isFeatured'))::boolean) = TRUE"));
    }
}
