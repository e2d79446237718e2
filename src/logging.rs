//! Logging configuration.
//!
//! The node logs through `tracing`. Hosts that do not install their own
//! subscriber can call [`init_logging`]; [`TracingLogger`] adapts the host
//! [`Logger`] capability onto the same subscriber.

use crate::host::{LogLevel, Logger};
use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns false if a global subscriber was already installed.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// A [`Logger`] that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "mysql_query_node", "{message}"),
            LogLevel::Info => tracing::info!(target: "mysql_query_node", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "mysql_query_node", "{message}"),
            LogLevel::Error => tracing::error!(target: "mysql_query_node", "{message}"),
        }
    }
}
