//! Host capabilities handed to the node on each invocation.
//!
//! The workflow engine owns credentials, parameter values, logging and the
//! item batch. The node sees them only through the traits in this module,
//! bundled into an [`ExecutionContext`].

use crate::config::Credentials;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One unit of workflow data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The item's fields, in insertion order.
    pub json: Map<String, Value>,

    /// Index of the input item this item was produced from.
    #[serde(
        rename = "pairedItem",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub paired_item: Option<usize>,
}

impl Item {
    /// Creates an item from its fields.
    pub fn new(json: Map<String, Value>) -> Self {
        Self {
            json,
            paired_item: None,
        }
    }

    /// Creates an item from a JSON value; non-objects yield an empty item.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(json) => Self::new(json),
            _ => Self::default(),
        }
    }

    /// Marks the item as derived from input item `index`.
    pub fn paired_with(mut self, index: usize) -> Self {
        self.paired_item = Some(index);
        self
    }
}

/// Supplies the credentials attached to the node.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the stored credentials, or `None` if none are attached.
    async fn credentials(&self) -> Result<Option<Credentials>>;
}

#[async_trait]
impl CredentialProvider for Credentials {
    async fn credentials(&self) -> Result<Option<Credentials>> {
        Ok(Some(self.clone()))
    }
}

#[async_trait]
impl CredentialProvider for Option<Credentials> {
    async fn credentials(&self) -> Result<Option<Credentials>> {
        Ok(self.clone())
    }
}

/// Supplies resolved parameter values per item.
pub trait ParameterProvider: Send + Sync {
    /// Returns the value of parameter `name` for item `item_index`.
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value>;
}

/// Parameters fixed at the node level, with optional per-item overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    node: Map<String, Value>,
    per_item: Vec<Map<String, Value>>,
}

impl StaticParameters {
    /// Creates parameters from a JSON object; non-objects yield no parameters.
    pub fn new(node: Value) -> Self {
        Self {
            node: match node {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            per_item: Vec::new(),
        }
    }

    /// Overrides parameters for one item.
    pub fn with_item_override(mut self, item_index: usize, overrides: Value) -> Self {
        if self.per_item.len() <= item_index {
            self.per_item.resize_with(item_index + 1, Map::new);
        }
        if let Value::Object(map) = overrides {
            self.per_item[item_index].extend(map);
        }
        self
    }
}

impl ParameterProvider for StaticParameters {
    fn parameter(&self, name: &str, item_index: usize) -> Option<Value> {
        self.per_item
            .get(item_index)
            .and_then(|overrides| overrides.get(name))
            .or_else(|| self.node.get(name))
            .cloned()
    }
}

/// Severity of a host log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// The host's logger.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Per-invocation settings from the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Turn per-item failures into error records instead of aborting.
    pub continue_on_fail: bool,

    /// Connect timeout override, taking precedence over the credentials.
    pub connection_timeout_ms: Option<u64>,
}

/// Everything the node may ask of its host during one invocation.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub credentials: &'a dyn CredentialProvider,
    pub parameters: &'a dyn ParameterProvider,
    pub logger: &'a dyn Logger,
    pub settings: ExecutionSettings,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        credentials: &'a dyn CredentialProvider,
        parameters: &'a dyn ParameterProvider,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            credentials,
            parameters,
            logger,
            settings: ExecutionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }
}
