//! Batch execution tests against the mock driver.
//!
//! Covers item/record alignment, continue-on-fail, and pool teardown.

use super::common::{fake_credentials, items, RecordingLogger};
use mysql_query_node::db::{MockDriver, QueryOutput};
use mysql_query_node::host::{LogLevel, StaticParameters};
use mysql_query_node::{DriverError, ExecutionContext, ExecutionSettings, NodeError, NodeExecutor};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn continue_on_fail() -> ExecutionSettings {
    ExecutionSettings {
        continue_on_fail: true,
        ..ExecutionSettings::default()
    }
}

#[tokio::test]
async fn test_output_length_matches_input_for_every_batch_size() {
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({"operation": "select", "table": "users"}));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger);

    for size in [0usize, 1, 2, 5] {
        let driver = MockDriver::new();
        let input: Vec<Value> = (0..size).map(|i| json!({ "i": i })).collect();

        let output = NodeExecutor::new(&driver)
            .execute(&ctx, items(&input))
            .await
            .unwrap();

        assert_eq!(output.len(), size.max(1), "batch of {size}");
        assert_eq!(driver.pools_created(), 1);
        assert_eq!(driver.close_count(), 1);
    }
}

#[tokio::test]
async fn test_records_preserve_order_and_original_fields() {
    let driver = MockDriver::new();
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({
        "operation": "delete",
        "table": "sessions",
        "where": "user_id = ?",
    }))
    .with_item_override(0, json!({"whereParams": "10"}))
    .with_item_override(1, json!({"whereParams": "20"}))
    .with_item_override(2, json!({"whereParams": "30"}));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger);

    let input = items(&[
        json!({"user": "ann", "rank": 1}),
        json!({"user": "bob", "rank": 2}),
        json!({"user": "cy", "rank": 3}),
    ]);
    let output = NodeExecutor::new(&driver).execute(&ctx, input).await.unwrap();

    let users: Vec<Value> = output.iter().map(|item| item.json["user"].clone()).collect();
    assert_eq!(users, vec![json!("ann"), json!("bob"), json!("cy")]);
    assert_eq!(output[2].json["rank"], 3);
    assert!(output.iter().all(|item| item.json["deleted"] == true));

    let params: Vec<Vec<Value>> = driver.executed().into_iter().map(|s| s.params).collect();
    assert_eq!(params, vec![vec![json!("10")], vec![json!("20")], vec![json!("30")]]);
}

#[tokio::test]
async fn test_where_params_are_trimmed_strings() {
    let driver = MockDriver::new();
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({
        "operation": "select",
        "table": "users",
        "where": "id = ? AND status = ?",
        "whereParams": "123, active",
        "returnAll": true,
    }));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger);

    NodeExecutor::new(&driver)
        .execute(&ctx, items(&[json!({})]))
        .await
        .unwrap();

    let executed = driver.executed();
    assert_eq!(
        executed[0].sql,
        "SELECT * FROM `users` WHERE id = ? AND status = ?"
    );
    assert_eq!(executed[0].params, vec![json!("123"), json!("active")]);
}

#[tokio::test]
async fn test_select_limit_only_when_not_returning_all() {
    let creds = fake_credentials();
    let logger = RecordingLogger::default();

    let limited = StaticParameters::new(json!({
        "operation": "select",
        "table": "users",
        "returnAll": false,
        "limit": 50,
    }));
    let driver = MockDriver::new();
    let ctx = ExecutionContext::new(&creds, &limited, &logger);
    NodeExecutor::new(&driver).execute(&ctx, vec![]).await.unwrap();
    assert_eq!(driver.executed_sql(), vec!["SELECT * FROM `users` LIMIT 50"]);

    let all = StaticParameters::new(json!({
        "operation": "select",
        "table": "users",
        "returnAll": true,
        "limit": 50,
    }));
    let driver = MockDriver::new();
    let ctx = ExecutionContext::new(&creds, &all, &logger);
    NodeExecutor::new(&driver).execute(&ctx, vec![]).await.unwrap();
    assert!(!driver.executed_sql()[0].contains("LIMIT"));
}

#[tokio::test]
async fn test_one_failure_among_many_with_continue_on_fail() {
    let driver = MockDriver::new()
        .with_response_once("INSERT", QueryOutput::with_affected_rows(1))
        .with_response_once("INSERT", QueryOutput::with_affected_rows(1))
        .with_error_once(
            "INSERT",
            DriverError::new("ER_DUP_ENTRY", "Duplicate entry 'x' for key 'PRIMARY'")
                .with_errno(1062)
                .with_sql_state("23000"),
        )
        .with_response("INSERT", QueryOutput::with_affected_rows(1));
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({
        "operation": "insert",
        "table": "codes",
        "data": {"code": "x"},
    }));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger).with_settings(continue_on_fail());

    let output = NodeExecutor::new(&driver)
        .execute(&ctx, items(&[json!({}), json!({}), json!({}), json!({})]))
        .await
        .unwrap();

    assert_eq!(output.len(), 4);
    let failed: Vec<usize> = output
        .iter()
        .enumerate()
        .filter(|(_, item)| item.json.get("error") == Some(&json!(true)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(failed, vec![2]);
    assert_eq!(output[2].json["errorCode"], "ER_DUP_ENTRY");
    assert_eq!(output[2].json["errorDetails"]["sqlState"], "23000");
    assert_eq!(output[3].json["rowCount"], 1);
    assert_eq!(driver.close_count(), 1);
    assert_eq!(logger.messages(LogLevel::Warn).len(), 1);
}

#[tokio::test]
async fn test_same_failure_without_continue_on_fail_aborts_and_releases_pool() {
    let driver = MockDriver::new()
        .with_response_once("INSERT", QueryOutput::with_affected_rows(1))
        .with_response_once("INSERT", QueryOutput::with_affected_rows(1))
        .with_error_once("INSERT", DriverError::new("ER_DUP_ENTRY", "Duplicate entry"))
        .with_response("INSERT", QueryOutput::with_affected_rows(1));
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({
        "operation": "insert",
        "table": "codes",
        "data": {"code": "x"},
    }));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger);

    let err = NodeExecutor::new(&driver)
        .execute(&ctx, items(&[json!({}), json!({}), json!({}), json!({})]))
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Driver(ref e) if e.code == "ER_DUP_ENTRY"));
    assert_eq!(driver.executed().len(), 3);
    assert_eq!(driver.close_count(), 1);
}

#[tokio::test]
async fn test_validation_failure_is_inline_with_continue_on_fail() {
    let driver = MockDriver::new();
    let creds = fake_credentials();
    let params = StaticParameters::new(json!({
        "operation": "update",
        "table": "users",
        "data": "{\"name\": \"Ann\"}",
        "where": "id = ?",
        "whereParams": "1",
    }))
    .with_item_override(1, json!({"data": "{not json"}));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger).with_settings(continue_on_fail());

    let output = NodeExecutor::new(&driver)
        .execute(&ctx, items(&[json!({}), json!({})]))
        .await
        .unwrap();

    assert_eq!(output[0].json.get("error"), None);
    assert_eq!(output[1].json["error"], true);
    assert_eq!(output[1].json["errorCode"], "VALIDATION_ERROR");
    assert!(output[1].json["errorMessage"]
        .as_str()
        .unwrap()
        .starts_with("Invalid JSON in data:"));
}

#[tokio::test]
async fn test_timeout_override_does_not_affect_missing_credential_error() {
    let driver = MockDriver::new();
    let creds = mysql_query_node::Credentials {
        host: None,
        ..fake_credentials()
    };
    let params = StaticParameters::new(json!({"query": "SELECT 1"}));
    let logger = RecordingLogger::default();
    let ctx = ExecutionContext::new(&creds, &params, &logger).with_settings(ExecutionSettings {
        continue_on_fail: true,
        connection_timeout_ms: Some(100),
    });

    let err = NodeExecutor::new(&driver)
        .execute(&ctx, items(&[json!({})]))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Configuration error: Missing required credential fields: host"
    );
    assert_eq!(driver.pools_created(), 0);
}
