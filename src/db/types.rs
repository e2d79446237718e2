//! Query result types.
//!
//! Defines the structures used to represent statement results coming back
//! from the database client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row of data, keyed by column name in result-set order.
pub type Row = Map<String, Value>;

/// Represents the result of executing one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Rows returned by the statement (empty for writes).
    pub rows: Vec<Row>,

    /// Column metadata for the result set.
    pub fields: Vec<FieldInfo>,

    /// Rows affected by a write statement.
    pub affected_rows: u64,

    /// Auto-increment id generated by an INSERT, if any.
    pub insert_id: Option<u64>,

    /// Rows actually changed by an UPDATE, when the client reports it.
    ///
    /// sqlx does not expose the server's info string, so `MySqlClient`
    /// always leaves this `None` and callers fall back to `affected_rows`.
    pub changed_rows: Option<u64>,
}

impl QueryOutput {
    /// Creates a result carrying the given rows.
    pub fn with_rows(fields: Vec<FieldInfo>, rows: Vec<Row>) -> Self {
        Self {
            rows,
            fields,
            ..Self::default()
        }
    }

    /// Creates a result for a write statement.
    pub fn with_affected_rows(affected_rows: u64) -> Self {
        Self {
            affected_rows,
            ..Self::default()
        }
    }

    /// Sets the generated id. Zero means no id was generated.
    pub fn with_insert_id(mut self, insert_id: u64) -> Self {
        self.insert_id = (insert_id != 0).then_some(insert_id);
        self
    }

    /// Sets the changed-row count.
    pub fn with_changed_rows(mut self, changed_rows: u64) -> Self {
        self.changed_rows = Some(changed_rows);
        self
    }

    /// Returns true if the statement produced a result set.
    pub fn returns_rows(&self) -> bool {
        !self.fields.is_empty() || !self.rows.is_empty()
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Column name.
    pub name: String,

    /// Column data type, as reported by the server.
    #[serde(rename = "type")]
    pub data_type: String,

    /// Originating table, when the client reports it.
    pub table: Option<String>,
}

impl FieldInfo {
    /// Creates field info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            table: None,
        }
    }
}
