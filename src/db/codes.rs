//! Error-code mapping for MySQL client failures.
//!
//! Server errors are named by their `ER_*` symbol; transport failures get
//! the errno-style codes (`ECONNREFUSED`, `ENOTFOUND`, ...) that callers
//! match on when classifying.

use crate::error::DriverError;
use sqlx::mysql::MySqlDatabaseError;
use std::io::ErrorKind;

/// Server error numbers this node has a symbolic name for.
const SERVER_ERRORS: &[(u16, &str)] = &[
    (1040, "ER_CON_COUNT_ERROR"),
    (1044, "ER_DBACCESS_DENIED_ERROR"),
    (1045, "ER_ACCESS_DENIED_ERROR"),
    (1046, "ER_NO_DB_ERROR"),
    (1048, "ER_BAD_NULL_ERROR"),
    (1049, "ER_BAD_DB_ERROR"),
    (1050, "ER_TABLE_EXISTS_ERROR"),
    (1054, "ER_BAD_FIELD_ERROR"),
    (1062, "ER_DUP_ENTRY"),
    (1064, "ER_PARSE_ERROR"),
    (1129, "ER_HOST_IS_BLOCKED"),
    (1130, "ER_HOST_NOT_PRIVILEGED"),
    (1142, "ER_TABLEACCESS_DENIED_ERROR"),
    (1146, "ER_NO_SUCH_TABLE"),
    (1205, "ER_LOCK_WAIT_TIMEOUT"),
    (1213, "ER_LOCK_DEADLOCK"),
    (1264, "ER_WARN_DATA_OUT_OF_RANGE"),
    (1366, "ER_TRUNCATED_WRONG_VALUE_FOR_FIELD"),
    (1406, "ER_DATA_TOO_LONG"),
    (1451, "ER_ROW_IS_REFERENCED_2"),
    (1452, "ER_NO_REFERENCED_ROW_2"),
    (2006, "PROTOCOL_CONNECTION_LOST"),
    (2013, "PROTOCOL_CONNECTION_LOST"),
];

/// Returns the symbolic name for a server error number.
pub fn error_name_for_errno(errno: u16) -> Option<&'static str> {
    SERVER_ERRORS
        .iter()
        .find(|(number, _)| *number == errno)
        .map(|(_, name)| *name)
}

/// Converts a sqlx error into a driver error with a stable code.
pub fn classify_sqlx_error(error: &sqlx::Error) -> DriverError {
    match error {
        sqlx::Error::Database(db_error) => {
            let message = db_error.message().to_string();
            match db_error.try_downcast_ref::<MySqlDatabaseError>() {
                Some(mysql_error) => {
                    let errno = mysql_error.number();
                    let code = error_name_for_errno(errno)
                        .map(String::from)
                        .unwrap_or_else(|| format!("ER_{errno}"));
                    let mut driver_error = DriverError::new(code, message).with_errno(errno);
                    if let Some(state) = mysql_error.code() {
                        driver_error = driver_error.with_sql_state(state);
                    }
                    driver_error
                }
                None => DriverError::new("DATABASE_ERROR", message),
            }
        }
        sqlx::Error::Io(io_error) => DriverError::new(io_error_code(io_error), error.to_string()),
        sqlx::Error::Tls(_) => DriverError::new("HANDSHAKE_SSL_ERROR", error.to_string()),
        sqlx::Error::PoolTimedOut => DriverError::new("ETIMEDOUT", error.to_string()),
        sqlx::Error::PoolClosed => DriverError::new("POOL_CLOSED", error.to_string()),
        sqlx::Error::Protocol(_) => DriverError::new("PROTOCOL_ERROR", error.to_string()),
        sqlx::Error::Configuration(_) => {
            DriverError::new("CONFIGURATION_ERROR", error.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            DriverError::new("DECODE_ERROR", error.to_string())
        }
        _ => DriverError::new("UNKNOWN_ERROR", error.to_string()),
    }
}

fn io_error_code(error: &std::io::Error) -> &'static str {
    match error.kind() {
        ErrorKind::ConnectionRefused => "ECONNREFUSED",
        ErrorKind::TimedOut => "ETIMEDOUT",
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => "PROTOCOL_CONNECTION_LOST",
        _ if is_lookup_failure(&error.to_string()) => "ENOTFOUND",
        _ => "EIO",
    }
}

/// DNS failures surface as uncategorized io errors; match on the resolver text.
fn is_lookup_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("nodename nor servname")
        || message.contains("no such host")
        || message.contains("temporary failure in name resolution")
}
