//! Connection integration tests.
//!
//! Tests credential checking and table listing against a real server.

use super::common::get_test_credentials;
use mysql_query_node::connection::{list_tables, test_credentials, TestStatus};
use mysql_query_node::db::{DatabaseDriver, MySqlDriver};
use mysql_query_node::{ConnectionParameters, Credentials};

#[tokio::test]
async fn test_valid_credentials_report_ok() {
    let Some(creds) = get_test_credentials() else {
        eprintln!("Skipping test: MYSQL_TEST_URL not set");
        return;
    };

    let result = test_credentials(&MySqlDriver::new(), &creds).await;
    assert_eq!(result.status, TestStatus::Ok, "{}", result.message);
}

#[tokio::test]
async fn test_wrong_password_reports_authentication_failure() {
    let Some(creds) = get_test_credentials() else {
        eprintln!("Skipping test: MYSQL_TEST_URL not set");
        return;
    };
    let creds = Credentials {
        password: Some("definitely-not-the-password".to_string()),
        ..creds
    };

    let result = test_credentials(&MySqlDriver::new(), &creds).await;

    assert_eq!(result.status, TestStatus::Error);
    assert!(
        result.message.starts_with("Authentication failed"),
        "unexpected message: {}",
        result.message
    );
}

#[tokio::test]
async fn test_unknown_database_is_reported() {
    let Some(creds) = get_test_credentials() else {
        eprintln!("Skipping test: MYSQL_TEST_URL not set");
        return;
    };
    let creds = Credentials {
        database: Some("no_such_database_for_tests".to_string()),
        ..creds
    };

    let result = test_credentials(&MySqlDriver::new(), &creds).await;

    assert_eq!(result.status, TestStatus::Error);
    // Some servers answer with access denied before checking the schema.
    assert!(
        result.message.contains("no_such_database_for_tests"),
        "unexpected message: {}",
        result.message
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_port() {
    let creds = Credentials {
        port: 1,
        connection_timeout: 2_000,
        ..Credentials::new("127.0.0.1", "testdb", "testuser", "testpass")
    };

    let result = test_credentials(&MySqlDriver::new(), &creds).await;

    assert_eq!(result.status, TestStatus::Error);
    assert!(
        result.message.starts_with("Connection refused")
            || result.message.contains("timed out"),
        "unexpected message: {}",
        result.message
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let creds = Credentials {
        connection_timeout: 2_000,
        ..Credentials::new(
            "invalid.host.that.does.not.exist.local",
            "testdb",
            "testuser",
            "testpass",
        )
    };
    let params = ConnectionParameters::resolve(Some(&creds), None).unwrap();

    let result = MySqlDriver::new().connect(&params).await;
    assert!(result.is_err());

    // Resolver behavior varies by system
    let code = result.err().map(|e| e.code().to_string()).unwrap_or_default();
    assert!(
        ["ENOTFOUND", "ETIMEDOUT", "EIO"].contains(&code.as_str()),
        "unexpected code: {code}"
    );
}

#[tokio::test]
async fn test_list_tables_returns_created_table() {
    let Some(creds) = get_test_credentials() else {
        eprintln!("Skipping test: MYSQL_TEST_URL not set");
        return;
    };
    let driver = MySqlDriver::new();
    let params = ConnectionParameters::resolve(Some(&creds), None).unwrap();

    let client = driver.connect(&params).await.unwrap();
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS mqn_list_probe (id INT PRIMARY KEY)",
            &[],
        )
        .await
        .unwrap();
    client.close().await.unwrap();

    let options = list_tables(&driver, &creds).await;

    let probe = options
        .iter()
        .find(|option| option.value == "mqn_list_probe")
        .expect("probe table should be listed");
    assert_eq!(probe.name, "mqn_list_probe");
    assert_eq!(probe.description, "Table: mqn_list_probe");

    let client = driver.connect(&params).await.unwrap();
    client
        .execute("DROP TABLE IF EXISTS mqn_list_probe", &[])
        .await
        .unwrap();
    client.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_list_tables_unreachable_server_yields_error_entry() {
    let creds = Credentials {
        port: 1,
        connection_timeout: 2_000,
        ..Credentials::new("127.0.0.1", "testdb", "testuser", "testpass")
    };

    let options = list_tables(&MySqlDriver::new(), &creds).await;

    assert_eq!(options.len(), 1);
    assert_eq!(options[0].name, "Error loading tables");
    assert_eq!(options[0].value, "");
}
