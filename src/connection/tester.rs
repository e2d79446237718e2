//! Credential testing.
//!
//! Opens one connection, runs a liveness query and turns any failure into a
//! message that tells the user what to fix.

use crate::config::{ConnectionParameters, Credentials};
use crate::db::DatabaseDriver;
use crate::error::NodeError;
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome reported back to the credential editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialTestResult {
    pub status: TestStatus,
    pub message: String,
}

impl CredentialTestResult {
    fn ok() -> Self {
        Self {
            status: TestStatus::Ok,
            message: "Connection successful".to_string(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TestStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestStatus {
    #[serde(rename = "OK")]
    Ok,
    Error,
}

/// Why a connection attempt failed, derived from the driver error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    Refused,
    HostNotFound,
    Timeout,
    AuthenticationFailed,
    UnknownDatabase,
    AccessDenied,
    ConnectionLost,
    TooManyConnections,
    HostBlocked,
    Other,
}

impl ConnectionFailure {
    /// Classifies a driver error code.
    pub fn from_code(code: &str) -> Self {
        match code {
            "ECONNREFUSED" => Self::Refused,
            "ENOTFOUND" => Self::HostNotFound,
            "ETIMEDOUT" => Self::Timeout,
            "ER_ACCESS_DENIED_ERROR" => Self::AuthenticationFailed,
            "ER_BAD_DB_ERROR" => Self::UnknownDatabase,
            "ER_DBACCESS_DENIED_ERROR" => Self::AccessDenied,
            "PROTOCOL_CONNECTION_LOST" => Self::ConnectionLost,
            "ER_CON_COUNT_ERROR" => Self::TooManyConnections,
            "ER_HOST_IS_BLOCKED" => Self::HostBlocked,
            _ => Self::Other,
        }
    }

    /// Builds the user-facing message for this failure.
    pub fn message(&self, params: &ConnectionParameters, error: &NodeError) -> String {
        let host = &params.host;
        let port = params.port;
        let user = &params.user;
        let database = &params.database;

        match self {
            Self::Refused => format!(
                "Connection refused by {host}:{port}. Check that the MySQL server is running and the port is correct."
            ),
            Self::HostNotFound => {
                format!("Host '{host}' could not be found. Check the hostname.")
            }
            Self::Timeout => format!(
                "Connection to {host}:{port} timed out. Check the host, port and any firewall between them."
            ),
            Self::AuthenticationFailed => format!(
                "Authentication failed for user '{user}'. Check the username and password."
            ),
            Self::UnknownDatabase => format!("Database '{database}' does not exist."),
            Self::AccessDenied => {
                format!("User '{user}' does not have access to database '{database}'.")
            }
            Self::ConnectionLost => {
                "The server closed the connection unexpectedly.".to_string()
            }
            Self::TooManyConnections => {
                "The server has reached its connection limit. Try again later.".to_string()
            }
            Self::HostBlocked => format!(
                "Host is blocked by {host} after too many connection errors. Run 'mysqladmin flush-hosts' on the server."
            ),
            Self::Other => format!("Connection failed: {}", error.message()),
        }
    }
}

/// Tests that the credentials can connect and run a query.
pub async fn test_credentials(
    driver: &dyn DatabaseDriver,
    credentials: &Credentials,
) -> CredentialTestResult {
    let missing = credentials.missing_fields();
    if !missing.is_empty() {
        return CredentialTestResult::error(format!(
            "Missing required fields: {}",
            missing.join(", ")
        ));
    }

    let params = match ConnectionParameters::resolve(Some(credentials), None) {
        Ok(params) => params,
        Err(e) => return CredentialTestResult::error(e.message()),
    };

    debug!("Testing credentials for {}", params.display_string());

    let client = match driver.connect(&params).await {
        Ok(client) => client,
        Err(e) => return failure(&params, &e),
    };

    let liveness = client.execute("SELECT 1", &[]).await;

    if let Err(e) = client.close().await {
        warn!("Failed to close test connection: {}", e);
    }

    match liveness {
        Ok(_) => CredentialTestResult::ok(),
        Err(e) => failure(&params, &e),
    }
}

fn failure(params: &ConnectionParameters, error: &NodeError) -> CredentialTestResult {
    let category = ConnectionFailure::from_code(error.code());
    debug!("Credential test failed ({:?}): {}", category, error);
    CredentialTestResult::error(category.message(params, error))
}
