//! MySQL database client implementation.
//!
//! Provides `MySqlDriver` and `MySqlClient`, which implement the database
//! traits on top of sqlx's MySQL pool and connection types.

use crate::config::ConnectionParameters;
use crate::db::{classify_sqlx_error, DatabaseClient, DatabaseDriver, FieldInfo, QueryOutput, Row};
use crate::error::{DriverError, NodeError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde_json::{Number, Value};
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions,
    MySqlQueryResult, MySqlRow, MySqlSslMode,
};
use sqlx::query::Query;
use sqlx::{
    Column as SqlxColumn, Connection, Either, Executor, Row as SqlxRow, Statement as _, TypeInfo,
};
use tokio::sync::Mutex;
use tracing::debug;

/// Upper bound on concurrently open pool connections.
const POOL_MAX_CONNECTIONS: u32 = 10;

type ResultStream<'a> = BoxStream<'a, std::result::Result<Either<MySqlQueryResult, MySqlRow>, sqlx::Error>>;

/// Creates sqlx-backed MySQL clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

impl MySqlDriver {
    pub fn new() -> Self {
        Self
    }

    fn connect_options(params: &ConnectionParameters) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .username(&params.user)
            .password(&params.password)
            .database(&params.database)
            .ssl_mode(if params.use_ssl {
                MySqlSslMode::Required
            } else {
                MySqlSslMode::Disabled
            })
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    async fn create_pool(&self, params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>> {
        debug!("Creating pool for {}", params.display_string());

        // Lazy: connection failures surface on the first statement of each item.
        let pool = MySqlPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .acquire_timeout(params.connect_timeout)
            .connect_lazy_with(Self::connect_options(params));

        Ok(Box::new(MySqlClient::from_pool(pool, params.clone())))
    }

    async fn connect(&self, params: &ConnectionParameters) -> Result<Box<dyn DatabaseClient>> {
        debug!("Opening connection to {}", params.display_string());

        let connection = open_connection(params).await?;
        Ok(Box::new(MySqlClient::from_connection(connection)))
    }
}

/// Opens one connection, bounded by the configured connect timeout.
async fn open_connection(
    params: &ConnectionParameters,
) -> std::result::Result<MySqlConnection, DriverError> {
    let options = MySqlDriver::connect_options(params);

    tokio::time::timeout(params.connect_timeout, MySqlConnection::connect_with(&options))
        .await
        .map_err(|_| {
            DriverError::new(
                "ETIMEDOUT",
                format!(
                    "Connection to {}:{} timed out after {} ms",
                    params.host,
                    params.port,
                    params.connect_timeout.as_millis()
                ),
            )
        })?
        .map_err(|e| classify_sqlx_error(&e))
}

/// The pool retries failed connects until its acquire deadline and then
/// reports only `PoolTimedOut`. One direct attempt recovers the real cause.
async fn pool_timeout_cause(params: &ConnectionParameters) -> DriverError {
    match open_connection(params).await {
        Ok(connection) => {
            if let Err(e) = connection.close().await {
                debug!("Failed to close diagnostic connection: {}", e);
            }
            classify_sqlx_error(&sqlx::Error::PoolTimedOut)
        }
        Err(cause) => cause,
    }
}

enum Target {
    Pool {
        pool: MySqlPool,
        params: ConnectionParameters,
    },
    Connection(Mutex<Option<MySqlConnection>>),
}

/// A MySQL pool or single connection.
pub struct MySqlClient {
    target: Target,
}

impl MySqlClient {
    /// Wraps an existing pool created from `params`.
    pub fn from_pool(pool: MySqlPool, params: ConnectionParameters) -> Self {
        Self {
            target: Target::Pool { pool, params },
        }
    }

    /// Wraps an open connection.
    pub fn from_connection(connection: MySqlConnection) -> Self {
        Self {
            target: Target::Connection(Mutex::new(Some(connection))),
        }
    }
}

#[async_trait]
impl DatabaseClient for MySqlClient {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryOutput> {
        debug!(params = params.len(), "Executing: {}", sql);

        match &self.target {
            Target::Pool {
                pool,
                params: connection_params,
            } => {
                let output = match describe(pool, sql).await {
                    Ok(fields) => {
                        #[allow(deprecated)]
                        let stream = build_query(sql, params).fetch_many(pool);
                        collect_output(stream, fields).await
                    }
                    Err(e) => Err(e),
                };

                match output {
                    Err(sqlx::Error::PoolTimedOut) => {
                        Err(pool_timeout_cause(connection_params).await.into())
                    }
                    other => other.map_err(|e| classify_sqlx_error(&e).into()),
                }
            }
            Target::Connection(slot) => {
                let mut guard = slot.lock().await;
                let connection = guard
                    .as_mut()
                    .ok_or_else(|| NodeError::driver("CONNECTION_CLOSED", "Connection is closed"))?;

                let output = match describe(&mut *connection, sql).await {
                    Ok(fields) => {
                        #[allow(deprecated)]
                        let stream = build_query(sql, params).fetch_many(&mut *connection);
                        collect_output(stream, fields).await
                    }
                    Err(e) => Err(e),
                };

                output.map_err(|e| classify_sqlx_error(&e).into())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        match &self.target {
            Target::Pool { pool, .. } => {
                pool.close().await;
                Ok(())
            }
            Target::Connection(slot) => match slot.lock().await.take() {
                Some(connection) => connection
                    .close()
                    .await
                    .map_err(|e| classify_sqlx_error(&e).into()),
                None => Ok(()),
            },
        }
    }
}

/// Binds each JSON parameter positionally.
fn build_query<'q>(sql: &'q str, params: &[Value]) -> Query<'q, MySql, MySqlArguments> {
    params.iter().fold(sqlx::query(sql), |query, value| match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        // Nested structures are stored as their JSON text.
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    })
}

/// Reads result-set columns from the prepared statement, so a query that
/// matches no rows still reports its fields.
///
/// Statements the server refuses to prepare report no fields here; running
/// them surfaces the real error.
async fn describe<'c, E>(executor: E, sql: &str) -> std::result::Result<Vec<FieldInfo>, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    match executor.prepare(sql).await {
        Ok(statement) => Ok(statement
            .columns()
            .iter()
            .map(|col| FieldInfo::new(col.name(), col.type_info().name()))
            .collect()),
        Err(sqlx::Error::Database(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

async fn collect_output(
    mut stream: ResultStream<'_>,
    fields: Vec<FieldInfo>,
) -> std::result::Result<QueryOutput, sqlx::Error> {
    let mut output = QueryOutput {
        fields,
        ..QueryOutput::default()
    };

    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(result) => {
                output.affected_rows += result.rows_affected();
                output = output.with_insert_id(result.last_insert_id());
            }
            Either::Right(row) => {
                if output.fields.is_empty() {
                    output.fields = field_info(&row);
                }
                output.rows.push(convert_row(&row));
            }
        }
    }

    Ok(output)
}

fn field_info(row: &MySqlRow) -> Vec<FieldInfo> {
    row.columns()
        .iter()
        .map(|col| FieldInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a sqlx MySqlRow to a JSON row keyed by column name.
fn convert_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|col| {
            let value = convert_value(row, col.ordinal(), col.type_info().name());
            (col.name().to_string(), value)
        })
        .collect()
}

/// Converts a single column value based on its reported type name.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    let value = match type_name {
        "NULL" => Some(Value::Null),

        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null)),

        t if t.ends_with("UNSIGNED") => row
            .try_get::<Option<u64>, _>(index)
            .ok()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null)),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .map(|v| v.map(Value::from).unwrap_or(Value::Null)),

        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .map(|v| v.map(|f| float_value(widen_f32(f))).unwrap_or(Value::Null)),

        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .map(|v| v.map(float_value).unwrap_or(Value::Null)),

        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .ok()
            .map(|v| {
                v.map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Value::Null)
            }),

        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .ok()
            .map(|v| {
                v.map(|t| Value::String(t.format("%H:%M:%S").to_string()))
                    .unwrap_or(Value::Null)
            }),

        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .ok()
            .map(|v| {
                v.map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                    .unwrap_or(Value::Null)
            }),

        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .ok()
            .map(|v| v.map(|dt| Value::String(dt.to_rfc3339())).unwrap_or(Value::Null)),

        "JSON" => row.try_get::<Option<Value>, _>(index).ok().map(Option::unwrap_or_default),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => row.try_get::<Option<Vec<u8>>, _>(index).ok().map(|v| {
            v.map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
                .unwrap_or(Value::Null)
        }),

        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .map(|v| v.map(Value::String).unwrap_or(Value::Null)),
    };

    // DECIMAL and anything unrecognized travel as text on the wire.
    value.unwrap_or_else(|| {
        row.try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null)
    })
}

/// Widens through the shortest decimal form, so FLOAT 1.1 reads as 1.1
/// rather than 1.100000023841858.
fn widen_f32(f: f32) -> f64 {
    f.to_string().parse().unwrap_or(f as f64)
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
