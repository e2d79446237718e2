//! Error types for the MySQL node.
//!
//! Defines the error enum shared by the executor, the table lister and the
//! credential tester, plus the structured driver error it wraps.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

/// Main error type for node operations.
#[derive(Error, Debug, Clone)]
pub enum NodeError {
    /// Missing or unusable credentials and connection settings.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid operation parameters (missing WHERE clause, malformed JSON, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The selected operation is not one this node knows.
    #[error("Validation error: unknown operation '{0}'")]
    UnknownOperation(String),

    /// Failure reported by the database client library.
    #[error("Database error: {0}")]
    Driver(DriverError),
}

impl NodeError {
    /// Creates a configuration error with the given message.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a driver error from a code and message.
    pub fn driver(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Driver(DriverError::new(code, msg))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "Configuration Error",
            Self::Validation(_) | Self::UnknownOperation(_) => "Validation Error",
            Self::Driver(_) => "Database Error",
        }
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &str {
        match self {
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Validation(_) | Self::UnknownOperation(_) => "VALIDATION_ERROR",
            Self::Driver(e) => &e.code,
        }
    }

    /// Returns the bare message, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(msg) | Self::Validation(msg) => msg.clone(),
            Self::UnknownOperation(op) => format!("unknown operation '{op}'"),
            Self::Driver(e) => e.message.clone(),
        }
    }

    /// Structured details attached to inline error records.
    pub fn details(&self) -> Value {
        match self {
            Self::Driver(e) => json!({
                "type": self.category(),
                "code": e.code,
                "errno": e.errno,
                "sqlState": e.sql_state,
            }),
            _ => json!({
                "type": self.category(),
                "code": self.code(),
            }),
        }
    }

    /// Returns true if this error must stop the whole batch regardless of
    /// the continue-on-fail setting.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::UnknownOperation(_))
    }
}

impl From<DriverError> for NodeError {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

/// A failure reported by the database client, carrying its stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Symbolic code, e.g. `ER_ACCESS_DENIED_ERROR` or `ECONNREFUSED`.
    pub code: String,
    /// Human-readable message from the client or server.
    pub message: String,
    /// Server error number, when the server produced the error.
    pub errno: Option<u16>,
    /// SQLSTATE, when the server produced the error.
    pub sql_state: Option<String>,
}

impl DriverError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            errno: None,
            sql_state: None,
        }
    }

    pub fn with_errno(mut self, errno: u16) -> Self {
        self.errno = Some(errno);
        self
    }

    pub fn with_sql_state(mut self, sql_state: impl Into<String>) -> Self {
        self.sql_state = Some(sql_state.into());
        self
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for DriverError {}

/// Result type alias using NodeError.
pub type Result<T> = std::result::Result<T, NodeError>;
