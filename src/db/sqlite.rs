//! SQLite executor implementation using sqlx.

use super::stream::{self, ChannelCursor};
use super::{ColumnInfo, Cursor, Executor, Row, Value};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Row as SqlxRow, TypeInfo, ValueRef};
use std::str::FromStr;

/// SQLite executor over a connection pool.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    /// Creates a new executor from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for a `sqlite:` URL, e.g. `sqlite::memory:` or
    /// `sqlite://app.db?mode=rwc`.
    pub async fn connect(url: &str) -> Result<Self> {
        if !url.starts_with("sqlite:") {
            return Err(Error::config(format!(
                "Invalid SQLite URL '{url}'. Expected a 'sqlite:' URL"
            )));
        }
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::config(format!("Invalid SQLite URL '{url}': {e}")))?;

        // An in-memory database exists per connection, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::execution(format!("Cannot open SQLite database: {e}")))?;

        Ok(Self { pool })
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Executor for SqliteExecutor {
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
                        sender.send_error(e.to_string()).await;
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

fn column_info(row: &SqliteRow) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
        .collect()
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts by the value's storage class, since SQLite columns computed by
/// expressions carry no declared type.
fn convert_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let column = row.column(index).name();
    let decode_error = |e: sqlx::Error| Error::scan(column, format!("cannot read value: {e}"));

    let raw = row.try_get_raw(index).map_err(decode_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_uppercase();

    let value = match storage_class.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int),
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    value.map_err(decode_error)
}
