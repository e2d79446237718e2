//! Mock database driver for testing.
//!
//! Replies to statements from a list of scripted rules and records every
//! statement, pool, connection and close it sees.

use super::{DatabaseClient, DatabaseDriver, QueryOutput};
use crate::config::ConnectionParameters;
use crate::error::{DriverError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A statement received by a mock client.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Output(QueryOutput),
    Error(DriverError),
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    reply: Reply,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    rules: Mutex<Vec<Rule>>,
    executed: Mutex<Vec<ExecutedStatement>>,
    connect_error: Mutex<Option<DriverError>>,
    close_error: Mutex<Option<DriverError>>,
    pools_created: AtomicUsize,
    connections_opened: AtomicUsize,
    closes: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock driver whose clients return scripted results.
///
/// Rules match when the statement text contains the rule's pattern. The
/// first live matching rule wins; `*_once` rules are used up after one
/// match. Statements matching no rule succeed with an empty result.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl MockDriver {
    /// Creates a mock driver with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    fn push_rule(self, pattern: &str, reply: Reply, remaining: Option<usize>) -> Self {
        lock(&self.state.rules).push(Rule {
            pattern: pattern.to_string(),
            reply,
            remaining,
        });
        self
    }

    /// Replies with `output` to every statement containing `pattern`.
    pub fn with_response(self, pattern: &str, output: QueryOutput) -> Self {
        self.push_rule(pattern, Reply::Output(output), None)
    }

    /// Replies with `output` to the next statement containing `pattern`.
    pub fn with_response_once(self, pattern: &str, output: QueryOutput) -> Self {
        self.push_rule(pattern, Reply::Output(output), Some(1))
    }

    /// Fails every statement containing `pattern`.
    pub fn with_error(self, pattern: &str, error: DriverError) -> Self {
        self.push_rule(pattern, Reply::Error(error), None)
    }

    /// Fails the next statement containing `pattern`.
    pub fn with_error_once(self, pattern: &str, error: DriverError) -> Self {
        self.push_rule(pattern, Reply::Error(error), Some(1))
    }

    /// Makes `connect` fail with the given error.
    pub fn with_connect_error(self, error: DriverError) -> Self {
        *lock(&self.state.connect_error) = Some(error);
        self
    }

    /// Makes `close` fail with the given error (after counting the close).
    pub fn with_close_error(self, error: DriverError) -> Self {
        *lock(&self.state.close_error) = Some(error);
        self
    }

    /// Returns every statement executed so far, in order.
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        lock(&self.state.executed).clone()
    }

    /// Returns the SQL text of every statement executed so far.
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed().into_iter().map(|s| s.sql).collect()
    }

    pub fn pools_created(&self) -> usize {
        self.state.pools_created.load(Ordering::SeqCst)
    }

    pub fn connections_opened(&self) -> usize {
        self.state.connections_opened.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called on any client from this driver.
    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseDriver for MockDriver {
    async fn create_pool(&self, _params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>> {
        self.state.pools_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockClient {
            state: Arc::clone(&self.state),
        }))
    }

    async fn connect(&self, _params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>> {
        if let Some(error) = lock(&self.state.connect_error).clone() {
            return Err(error.into());
        }
        self.state.connections_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockClient {
            state: Arc::clone(&self.state),
        }))
    }
}

/// A client handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockClient {
    state: Arc<MockState>,
}

#[async_trait]
impl DatabaseClient for MockClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        lock(&self.state.executed).push(ExecutedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        let mut rules = lock(&self.state.rules);
        let rule = rules
            .iter_mut()
            .find(|rule| rule.remaining != Some(0) && sql.contains(&rule.pattern));

        let Some(rule) = rule else {
            return Ok(QueryOutput::default());
        };

        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }

        match &rule.reply {
            Reply::Output(output) => Ok(output.clone()),
            Reply::Error(error) => Err(error.clone().into()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        match lock(&self.state.close_error).clone() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}
