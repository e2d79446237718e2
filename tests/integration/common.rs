//! Shared helpers for integration tests.

use mysql_query_node::host::{LogLevel, Logger};
use mysql_query_node::{Credentials, Item};
use serde_json::Value;
use std::sync::Mutex;

/// Helper to get test credentials from the environment.
pub fn get_test_credentials() -> Option<Credentials> {
    let url = std::env::var("MYSQL_TEST_URL").ok()?;
    Credentials::from_connection_string(&url).ok()
}

/// Credentials for tests that never reach a server.
pub fn fake_credentials() -> Credentials {
    Credentials::new("localhost", "shop", "app", "pw")
}

pub fn items(values: &[Value]) -> Vec<Item> {
    values.iter().cloned().map(Item::from_value).collect()
}

/// A logger that keeps every message for later assertions.
#[derive(Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingLogger {
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}
