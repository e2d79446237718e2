//! Batch execution of node operations.
//!
//! One pool is created per batch and closed when the batch ends, whether it
//! succeeds, aborts, or records per-item failures.

use crate::config::ConnectionParameters;
use crate::db::{DatabaseClient, DatabaseDriver, QueryOutput};
use crate::error::{NodeError, Result};
use crate::host::{ExecutionContext, Item};
use crate::query::builder::{self, Statement};
use crate::query::operation::{Operation, OperationKind};
use serde_json::{json, Map, Value};
use std::time::Instant;

/// Runs the node's operations over a batch of items.
pub struct NodeExecutor<'a> {
    driver: &'a dyn DatabaseDriver,
}

impl<'a> NodeExecutor<'a> {
    /// Creates a new executor on the given driver.
    pub fn new(driver: &'a dyn DatabaseDriver) -> Self {
        Self { driver }
    }

    /// Executes the configured operation once per input item.
    ///
    /// Returns one record per input item in input order, or a single record
    /// for an empty batch.
    pub async fn execute(&self, ctx: &ExecutionContext<'_>, items: Vec<Item>) -> Result<Vec<Item>> {
        let credentials = ctx.credentials.credentials().await?;
        let params =
            ConnectionParameters::resolve(credentials.as_ref(), ctx.settings.connection_timeout_ms)?;
        let kind = OperationKind::from_parameters(ctx.parameters)?;

        let items = if items.is_empty() {
            vec![Item::default()]
        } else {
            items
        };

        ctx.logger.debug(&format!(
            "Running {kind} on {} item(s) against {}",
            items.len(),
            params.display_string()
        ));

        let pool = self.driver.create_pool(&params).await?;
        let result = self.run_batch(ctx, pool.as_ref(), kind, items).await;

        if let Err(e) = pool.close().await {
            ctx.logger.warn(&format!("Failed to close connection pool: {e}"));
        }

        result
    }

    async fn run_batch(
        &self,
        ctx: &ExecutionContext<'_>,
        pool: &dyn DatabaseClient,
        kind: OperationKind,
        items: Vec<Item>,
    ) -> Result<Vec<Item>> {
        let mut output = Vec::with_capacity(items.len());

        for (index, item) in items.into_iter().enumerate() {
            let start = Instant::now();
            let outcome = match Operation::from_parameters(kind, ctx.parameters, index) {
                Ok(operation) => run_operation(ctx, pool, &operation).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(fields) => {
                    ctx.logger.debug(&format!(
                        "Item {index}: {kind} completed in {:?}",
                        start.elapsed()
                    ));
                    output.push(merge(item, fields).paired_with(index));
                }
                Err(e) if ctx.settings.continue_on_fail && !e.aborts_batch() => {
                    ctx.logger.warn(&format!("Item {index}: {kind} failed: {e}"));
                    output.push(merge(item, error_fields(&e)).paired_with(index));
                }
                Err(e) => {
                    ctx.logger.error(&format!("Item {index}: {kind} failed: {e}"));
                    return Err(e);
                }
            }
        }

        Ok(output)
    }
}

/// Runs one operation and returns the fields to add to the item.
async fn run_operation(
    ctx: &ExecutionContext<'_>,
    pool: &dyn DatabaseClient,
    operation: &Operation,
) -> Result<Map<String, Value>> {
    match operation {
        Operation::ExecuteQuery { query, params } => {
            let params = params.iter().cloned().map(Value::String).collect();
            let output = execute(pool, &Statement::new(query.clone(), params)).await?;
            Ok(shape_execute_query(output))
        }
        Operation::Select {
            table,
            columns,
            filter,
            order_by,
            limit,
        } => {
            let statement =
                builder::select(table, columns, filter.as_ref(), order_by.as_deref(), *limit);
            let output = execute(pool, &statement).await?;
            Ok(object(json!({
                "rows": output.rows,
                "rowCount": output.rows.len(),
            })))
        }
        Operation::Insert {
            table,
            data,
            return_fields,
        } => {
            let output = execute(pool, &builder::insert(table, data)).await?;

            let mut inserted = object(json!({
                "insertId": output.insert_id,
                "affectedRows": output.affected_rows,
            }));

            if let Some(insert_id) = output.insert_id {
                let fetch = builder::select_inserted(table, return_fields, insert_id);
                match execute(pool, &fetch).await {
                    Ok(fetched) => {
                        if let Some(row) = fetched.rows.into_iter().next() {
                            inserted.extend(row);
                        }
                    }
                    Err(e) => ctx
                        .logger
                        .warn(&format!("Could not read back inserted row from {table}: {e}")),
                }
            }

            Ok(object(json!({
                "inserted": inserted,
                "rowCount": output.affected_rows,
            })))
        }
        Operation::Update {
            table,
            data,
            filter,
            return_fields,
        } => {
            let output = execute(pool, &builder::update(table, data, filter)).await?;

            let fetch = builder::select(table, return_fields, Some(filter), None, None);
            let updated = match execute(pool, &fetch).await {
                Ok(fetched) => fetched.rows,
                Err(e) => {
                    ctx.logger
                        .warn(&format!("Could not read back updated rows from {table}: {e}"));
                    Vec::new()
                }
            };

            Ok(object(json!({
                "updated": updated,
                "rowCount": output.affected_rows,
                "changedRows": output.changed_rows.unwrap_or(output.affected_rows),
            })))
        }
        Operation::Delete { table, filter } => {
            let output = execute(pool, &builder::delete(table, filter)).await?;
            Ok(object(json!({
                "deleted": true,
                "rowCount": output.affected_rows,
            })))
        }
    }
}

async fn execute(pool: &dyn DatabaseClient, statement: &Statement) -> Result<QueryOutput> {
    pool.execute(&statement.sql, &statement.params).await
}

fn shape_execute_query(output: QueryOutput) -> Map<String, Value> {
    let returns_rows = output.returns_rows();
    let row_count = if returns_rows {
        output.rows.len() as u64
    } else {
        output.affected_rows
    };

    let mut fields = object(json!({
        "rows": output.rows,
        "rowCount": row_count,
    }));

    if !returns_rows {
        fields.insert("affectedRows".to_string(), json!(output.affected_rows));
        if let Some(insert_id) = output.insert_id {
            fields.insert("insertId".to_string(), json!(insert_id));
        }
    }

    if !output.fields.is_empty() {
        fields.insert("fields".to_string(), json!(output.fields));
    }

    fields
}

fn error_fields(error: &NodeError) -> Map<String, Value> {
    object(json!({
        "error": true,
        "errorMessage": error.message(),
        "errorCode": error.code(),
        "errorDetails": error.details(),
    }))
}

/// Adds `fields` to the item's own fields; operation fields win on conflict.
fn merge(mut item: Item, fields: Map<String, Value>) -> Item {
    item.json.extend(fields);
    item
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
