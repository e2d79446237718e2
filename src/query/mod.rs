//! Query building and execution.
//!
//! Turns the node's declarative parameters into statements and runs them
//! over a batch of items.

pub mod builder;
pub mod executor;
pub mod operation;

pub use builder::{Statement, WhereClause};
pub use executor::NodeExecutor;
pub use operation::{Operation, OperationKind};
