//! Table listing for the table dropdown.

use crate::config::ConnectionParameters;
use crate::db::DatabaseDriver;
use crate::error::Result;
use crate::host::CredentialProvider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

const LIST_TABLES_SQL: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS name \
     FROM information_schema.TABLES \
     WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
     ORDER BY TABLE_NAME";

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOption {
    pub name: String,
    pub value: String,
    pub description: String,
}

impl ListOption {
    fn table(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: name.to_string(),
            description: format!("Table: {name}"),
        }
    }

    fn placeholder(name: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            description: description.into(),
        }
    }
}

/// Lists base tables in the configured database, ordered by name.
///
/// Never fails: missing credentials or any error yield a single
/// placeholder entry describing the problem.
pub async fn list_tables(
    driver: &dyn DatabaseDriver,
    credentials: &dyn CredentialProvider,
) -> Vec<ListOption> {
    let credentials = match credentials.credentials().await {
        Ok(Some(credentials)) if credentials.missing_fields().is_empty() => credentials,
        Ok(_) => {
            return vec![ListOption::placeholder(
                "No credentials",
                "Configure MySQL credentials to load tables",
            )]
        }
        Err(e) => return vec![ListOption::placeholder("Error loading tables", e.message())],
    };

    let result = match ConnectionParameters::resolve(Some(&credentials), None) {
        Ok(params) => fetch_table_names(driver, &params).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(names) => names.iter().map(|name| ListOption::table(name)).collect(),
        Err(e) => {
            warn!("Failed to list tables: {}", e);
            vec![ListOption::placeholder("Error loading tables", e.message())]
        }
    }
}

async fn fetch_table_names(
    driver: &dyn DatabaseDriver,
    params: &ConnectionParameters,
) -> Result<Vec<String>> {
    let client = driver.connect(params).await?;

    let result = client
        .execute(LIST_TABLES_SQL, &[Value::String(params.database.clone())])
        .await;

    if let Err(e) = client.close().await {
        warn!("Failed to close table listing connection: {}", e);
    }

    Ok(result?
        .rows
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str))
        .map(String::from)
        .collect())
}
