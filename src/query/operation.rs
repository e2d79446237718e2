//! Operation requests.
//!
//! Each variant owns exactly the fields its operation needs. Requests are
//! read from the host's parameters per item and validated on construction.

use crate::error::{NodeError, Result};
use crate::host::ParameterProvider;
use crate::query::builder::{split_params, WhereClause};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Default row limit for SELECT when not returning all rows.
pub const DEFAULT_LIMIT: u64 = 50;

/// The operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ExecuteQuery,
    Select,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecuteQuery => "executeQuery",
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Reads the selector from the `operation` parameter, defaulting to
    /// `executeQuery` when absent.
    pub fn from_parameters(params: &dyn ParameterProvider) -> Result<Self> {
        match params.parameter("operation", 0) {
            None | Some(Value::Null) => Ok(Self::ExecuteQuery),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(NodeError::UnknownOperation(other.to_string())),
        }
    }
}

impl FromStr for OperationKind {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "executeQuery" => Ok(Self::ExecuteQuery),
            "select" => Ok(Self::Select),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(NodeError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated operation request for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ExecuteQuery {
        query: String,
        params: Vec<String>,
    },
    Select {
        table: String,
        columns: String,
        filter: Option<WhereClause>,
        order_by: Option<String>,
        /// `None` returns all rows.
        limit: Option<u64>,
    },
    Insert {
        table: String,
        data: Map<String, Value>,
        return_fields: String,
    },
    Update {
        table: String,
        data: Map<String, Value>,
        filter: WhereClause,
        return_fields: String,
    },
    Delete {
        table: String,
        filter: WhereClause,
    },
}

impl Operation {
    /// Builds the request for item `index` from the host's parameters.
    pub fn from_parameters(
        kind: OperationKind,
        params: &dyn ParameterProvider,
        index: usize,
    ) -> Result<Self> {
        let reader = Reader { params, index };

        match kind {
            OperationKind::ExecuteQuery => {
                let query = reader.string("query", "");
                if query.trim().is_empty() {
                    return Err(NodeError::validation("Query is required"));
                }
                Ok(Self::ExecuteQuery {
                    query,
                    params: split_params(&reader.string("queryParams", "")),
                })
            }
            OperationKind::Select => {
                let return_all = reader.boolean("returnAll")?;
                let limit = if return_all {
                    None
                } else {
                    let limit = reader.unsigned("limit", DEFAULT_LIMIT)?;
                    if limit == 0 {
                        return Err(NodeError::validation("Limit must be at least 1"));
                    }
                    Some(limit)
                };

                let order_by = reader.string("orderBy", "");
                Ok(Self::Select {
                    table: reader.table()?,
                    columns: reader.string("columns", "*"),
                    filter: reader.optional_filter(),
                    order_by: (!order_by.trim().is_empty()).then_some(order_by),
                    limit,
                })
            }
            OperationKind::Insert => Ok(Self::Insert {
                table: reader.table()?,
                data: reader.data()?,
                return_fields: reader.string("returnFields", "*"),
            }),
            OperationKind::Update => {
                let table = reader.table()?;
                let filter = reader.required_filter(kind)?;
                Ok(Self::Update {
                    table,
                    data: reader.data()?,
                    filter,
                    return_fields: reader.string("returnFields", "*"),
                })
            }
            OperationKind::Delete => {
                let table = reader.table()?;
                let filter = reader.required_filter(kind)?;
                Ok(Self::Delete { table, filter })
            }
        }
    }
}

struct Reader<'a> {
    params: &'a dyn ParameterProvider,
    index: usize,
}

impl Reader<'_> {
    fn get(&self, name: &str) -> Option<Value> {
        self.params
            .parameter(name, self.index)
            .filter(|value| !value.is_null())
    }

    fn string(&self, name: &str, default: &str) -> String {
        match self.get(name) {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }

    fn boolean(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::String(s)) if s == "true" => Ok(true),
            Some(Value::String(s)) if s == "false" => Ok(false),
            Some(other) => Err(NodeError::validation(format!(
                "Parameter '{name}' must be a boolean, got {other}"
            ))),
        }
    }

    fn unsigned(&self, name: &str, default: u64) -> Result<u64> {
        match self.get(name) {
            None => Ok(default),
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                NodeError::validation(format!(
                    "Parameter '{name}' must be a non-negative integer, got {n}"
                ))
            }),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| {
                NodeError::validation(format!(
                    "Parameter '{name}' must be a non-negative integer, got '{s}'"
                ))
            }),
            Some(other) => Err(NodeError::validation(format!(
                "Parameter '{name}' must be a non-negative integer, got {other}"
            ))),
        }
    }

    fn table(&self) -> Result<String> {
        let table = self.string("table", "");
        if table.trim().is_empty() {
            return Err(NodeError::validation("Table name is required"));
        }
        Ok(table.trim().to_string())
    }

    fn optional_filter(&self) -> Option<WhereClause> {
        let condition = self.string("where", "");
        if condition.trim().is_empty() {
            return None;
        }
        Some(WhereClause::new(
            condition.trim(),
            split_params(&self.string("whereParams", "")),
        ))
    }

    fn required_filter(&self, kind: OperationKind) -> Result<WhereClause> {
        self.optional_filter().ok_or_else(|| {
            NodeError::validation(format!("WHERE clause is required for {kind} operations"))
        })
    }

    fn data(&self) -> Result<Map<String, Value>> {
        let value = match self.get("data") {
            None => return Err(NodeError::validation("Data is required")),
            Some(Value::String(raw)) => serde_json::from_str(&raw)
                .map_err(|e| NodeError::validation(format!("Invalid JSON in data: {e}")))?,
            Some(value) => value,
        };

        match value {
            Value::Object(map) if !map.is_empty() => Ok(map),
            Value::Object(_) => Err(NodeError::validation("Data must contain at least one column")),
            other => Err(NodeError::validation(format!(
                "Data must be a JSON object, got {other}"
            ))),
        }
    }
}
