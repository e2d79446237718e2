//! Integration tests for the MySQL node.
//!
//! Live-server tests skip themselves when MYSQL_TEST_URL is not set.

pub mod batch_test;
pub mod common;
pub mod connection_test;
