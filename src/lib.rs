//! MySQL query node for workflow automation engines.
//!
//! Runs raw SQL, SELECT, INSERT, UPDATE and DELETE operations over a batch
//! of workflow items, plus credential testing and table listing.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod host;
pub mod logging;
pub mod query;

pub use config::{ConnectionParameters, Credentials};
pub use error::{DriverError, NodeError, Result};
pub use host::{ExecutionContext, ExecutionSettings, Item};
pub use query::NodeExecutor;
