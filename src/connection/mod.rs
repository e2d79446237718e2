//! Connection-level helpers used outside batch execution.
//!
//! Both open a single short-lived connection rather than a pool.

pub mod tables;
pub mod tester;

pub use tables::{list_tables, ListOption};
pub use tester::{test_credentials, ConnectionFailure, CredentialTestResult, TestStatus};
