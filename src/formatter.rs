//! Turns records into SQL tuple literals for bulk `INSERT` statements.
//!
//! Raw values are never spliced into SQL by hand: every value goes through
//! the PostgreSQL driver's literal escaping.

use crate::constants::VALUE_PLACEHOLDER;
use crate::models::{Record, Table};
use postgres_protocol::escape::escape_literal;
use std::collections::HashMap;

/// Per-table overrides of the normal value substitution.
///
/// A rule is a literal SQL expression that replaces the column's value. It
/// may contain `{value}`, which is replaced with the escaped raw value (or
/// `NULL` when the record does not carry the column). Built once per load and
/// never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionRules {
    rules: HashMap<&'static str, String>,
}

impl SubstitutionRules {
    /// Built-in rules for `table`.
    ///
    /// Old dumps carry `ViewCount=""` on some posts, which does not cast to
    /// an integer. Post bodies are dropped unless `with_post_body` is set.
    pub fn for_table(table: Table, with_post_body: bool) -> Self {
        let mut rules = Self::default();
        if table == Table::Posts {
            rules = rules.with_rule("ViewCount", "NULLIF({value}, '')::int");
            if !with_post_body {
                rules = rules.with_rule("Body", "NULL");
            }
        }
        rules
    }

    pub fn with_rule(mut self, column: &'static str, expression: impl Into<String>) -> Self {
        self.rules.insert(column, expression.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.rules.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Formats records against a fixed column template.
#[derive(Debug, Clone, Copy)]
pub struct RowFormatter<'a> {
    columns: &'a [&'static str],
    rules: &'a SubstitutionRules,
}

impl<'a> RowFormatter<'a> {
    pub fn new(columns: &'a [&'static str], rules: &'a SubstitutionRules) -> Self {
        Self { columns, rules }
    }

    /// Renders `record` as `(v1, v2, ...)` with one element per template column.
    pub fn format(&self, record: &Record) -> String {
        let values: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let literal = sql_literal(record.get(column));
                match self.rules.get(column) {
                    Some(expression) => expression.replace(VALUE_PLACEHOLDER, &literal),
                    None => literal,
                }
            })
            .collect();

        format!("({})", values.join(", "))
    }
}

/// Escaped string literal for a present value, `NULL` for an absent one.
///
/// `escape_literal` prefixes `E'...'` literals with a space; it is dropped so
/// tuples stay evenly separated.
fn sql_literal(value: Option<&str>) -> String {
    match value {
        Some(raw) => escape_literal(raw).trim_start().to_string(),
        None => "NULL".to_string(),
    }
}

/// Joins formatted tuples into one multi-row `INSERT`.
///
/// Returns `None` when there is nothing to insert.
pub fn insert_statement(table: Table, tuples: &[String]) -> Option<String> {
    if tuples.is_empty() {
        return None;
    }
    Some(format!(
        "INSERT INTO {} VALUES\n{};",
        table.name(),
        tuples.join(",\n")
    ))
}
