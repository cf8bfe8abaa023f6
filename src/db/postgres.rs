//! PostgreSQL executor implementation.
//!
//! Provides the `PostgresExecutor` struct that implements the `Executor` trait
//! for PostgreSQL databases using sqlx.

use super::pg_format;
use super::stream::{self, ChannelCursor};
use super::{ColumnInfo, Cursor, Executor, Row, Value};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::debug;

/// PostgreSQL executor over a connection pool.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Creates a new executor from an existing connection pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool for the given connection settings. Fields left unset
    /// fall back to the `PG*` environment variables.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut config = config.clone();
        config.apply_env_defaults();
        let config = &config;
        let conn_str = config.to_connection_string()?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("Connected to {}", config.display_string());
        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn query(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        let (mut sender, receiver) = stream::channel();
        let pool = self.pool.clone();
        let sql = sql.to_string();

        tokio::spawn(async move {
            let mut rows = sqlx::query(&sql).fetch(&pool);
            while let Some(item) = rows.next().await {
                let delivered = match item {
                    Ok(row) => match convert_row(&row) {
                        Ok(values) => sender.send_row(|| column_info(&row), values).await,
                        Err(e) => {
                            sender.send_decode_error(e).await;
                            false
                        }
                    },
                    Err(e) => {
                        sender.send_error(format_query_error(e)).await;
                        false
                    }
                };
                if !delivered {
                    break;
                }
            }
        });

        let cursor = ChannelCursor::open(receiver).await?;
        Ok(Box::new(cursor))
    }
}

fn column_info(row: &PgRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

/// Converts a PgRow to our Row type, failing on the first column that
/// cannot be read.
fn convert_row(row: &PgRow) -> Result<Row> {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// Types without a native `Value` counterpart are rendered as text; a value
/// that cannot be read is an error, never NULL.
fn convert_value(row: &PgRow, index: usize) -> Result<Value> {
    let column = row.column(index);
    let type_name = column.type_info().name();
    let decode_error = |message: String| {
        Error::scan(
            column.name(),
            format!("cannot read {type_name} value: {message}"),
        )
    };

    let raw = row
        .try_get_raw(index)
        .map_err(|e| decode_error(e.to_string()))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_name {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool),
        "INT2" => row.try_get::<i16, _>(index).map(|v| Value::Int(v.into())),
        "INT4" => row.try_get::<i32, _>(index).map(|v| Value::Int(v.into())),
        "INT8" => row.try_get::<i64, _>(index).map(Value::Int),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::Float(v.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::Float),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ if pg_format::renders(type_name) => {
            let bytes = raw.as_bytes().map_err(|e| decode_error(e.to_string()))?;
            return pg_format::render(type_name, bytes)
                .map(Value::String)
                .map_err(decode_error);
        }
        // Text-like types; anything else fails here and needs a cast
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    value.map_err(|e| decode_error(format!("{e}; cast the column to text in the query")))
}

/// Maps sqlx connection errors to readable messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> Error {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        Error::execution(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        Error::execution(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        Error::execution(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        Error::execution(format!("Connection to {host}:{port} timed out."))
    } else {
        Error::execution(error.to_string())
    }
}

/// Formats a query error with the Postgres detail and hint, if any.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
