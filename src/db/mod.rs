//! Database abstraction layer.
//!
//! Provides a trait-based interface over the MySQL client library so the
//! executor, table lister and credential tester can run against either the
//! real driver or a scripted mock.

mod codes;
mod mock;
mod mysql;
mod types;

pub use codes::{classify_sqlx_error, error_name_for_errno};
pub use mock::{ExecutedStatement, MockClient, MockDriver};
pub use mysql::{MySqlClient, MySqlDriver};
pub use types::{FieldInfo, QueryOutput, Row};

use crate::config::ConnectionParameters;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for creating database clients from resolved connection settings.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Creates a connection pool shared across one batch.
    async fn create_pool(&self, params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>>;

    /// Opens a single short-lived connection.
    async fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>>;
}

/// Trait defining the interface for database clients.
///
/// All operations are async and return Results with NodeError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Executes a prepared statement with positional parameters.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput>;

    /// Closes the pool or connection.
    async fn close(&self) -> Result<()>;
}
