//! SQL statement construction.
//!
//! Identifiers are quoted with backticks; values always travel as
//! positional `?` parameters. WHERE and ORDER BY fragments are caller SQL
//! and are inserted verbatim.

use serde_json::{Map, Value};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A caller-supplied WHERE fragment with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhereClause {
    pub condition: String,
    pub params: Vec<String>,
}

impl WhereClause {
    pub fn new(condition: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            condition: condition.into(),
            params,
        }
    }

    fn param_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.params.iter().cloned().map(Value::String)
    }
}

/// Splits a comma-separated parameter list, trimming each token.
///
/// A blank list yields no parameters. Values cannot contain commas.
pub fn split_params(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|token| token.trim().to_string()).collect()
}

/// Quotes an identifier, quoting each segment of `schema.table` separately.
pub fn quote_identifier(name: &str) -> String {
    name.trim()
        .split('.')
        .map(|segment| format!("`{}`", segment.trim().replace('`', "``")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quotes a comma-separated column list; `*` and blank lists pass through as `*`.
pub fn quote_column_list(columns: &str) -> String {
    let columns = columns.trim();
    if columns.is_empty() || columns == "*" {
        return "*".to_string();
    }

    columns
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(|column| {
            if column == "*" {
                column.to_string()
            } else {
                quote_identifier(column)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT <columns> FROM <table> [WHERE ..] [ORDER BY ..] [LIMIT n]`
pub fn select(
    table: &str,
    columns: &str,
    filter: Option<&WhereClause>,
    order_by: Option<&str>,
    limit: Option<u64>,
) -> Statement {
    let mut sql = format!(
        "SELECT {} FROM {}",
        quote_column_list(columns),
        quote_identifier(table)
    );
    let mut params = Vec::new();

    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.condition);
        params.extend(filter.param_values());
    }

    if let Some(order_by) = order_by.map(str::trim).filter(|o| !o.is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Statement::new(sql, params)
}

/// `INSERT INTO <table> (<cols>) VALUES (?, ...)` in the data's key order.
pub fn insert(table: &str, data: &Map<String, Value>) -> Statement {
    let columns: Vec<String> = data.keys().map(|k| quote_identifier(k)).collect();
    let placeholders = vec!["?"; data.len()].join(", ");

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders
    );

    Statement::new(sql, data.values().cloned().collect())
}

/// Follow-up read of a freshly inserted row by its generated id.
pub fn select_inserted(table: &str, return_fields: &str, insert_id: u64) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE id = ?",
            quote_column_list(return_fields),
            quote_identifier(table)
        ),
        vec![Value::from(insert_id)],
    )
}

/// `UPDATE <table> SET <col> = ?, ... WHERE <where>`; data params precede where params.
pub fn update(table: &str, data: &Map<String, Value>, filter: &WhereClause) -> Statement {
    let assignments: Vec<String> = data
        .keys()
        .map(|k| format!("{} = ?", quote_identifier(k)))
        .collect();

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        quote_identifier(table),
        assignments.join(", "),
        filter.condition
    );

    let mut params: Vec<Value> = data.values().cloned().collect();
    params.extend(filter.param_values());

    Statement::new(sql, params)
}

/// `DELETE FROM <table> WHERE <where>`
pub fn delete(table: &str, filter: &WhereClause) -> Statement {
    Statement::new(
        format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(table),
            filter.condition
        ),
        filter.param_values().collect(),
    )
}
