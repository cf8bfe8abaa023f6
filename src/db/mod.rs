//! Database abstraction layer for rowscan.
//!
//! Provides the executor and cursor traits the select pipeline consumes,
//! allowing different database backends to be used interchangeably.

mod memory;
mod pg_format;
mod postgres;
mod sqlite;
mod stream;
mod types;

pub use memory::{MemoryExecutor, ScriptedResult};
pub use postgres::PostgresExecutor;
pub use sqlite::SqliteExecutor;
pub use types::{ColumnInfo, ResultSet, Row, Value};

use crate::error::Result;
use async_trait::async_trait;
use tracing::trace;

/// Submits literal SQL and opens a cursor over its result.
///
/// Implementations surface a rejected query from `query` itself, as
/// [`Error::Execution`](crate::Error::Execution).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Box<dyn Cursor>>;
}

/// A forward-only cursor over the rows of one query.
#[async_trait]
pub trait Cursor: Send {
    /// Columns of the result set.
    ///
    /// Streaming cursors may only learn their columns from the first row, so
    /// callers read this after the first successful `next_row`.
    fn columns(&self) -> &[ColumnInfo];

    /// Fetches the next row, or `None` once the result is exhausted.
    ///
    /// An error here is an iteration failure; the cursor is unusable after it.
    async fn next_row(&mut self) -> Result<Option<Row>>;

    /// Releases the underlying resources. Must be idempotent.
    fn close(&mut self);
}

/// Owns a cursor for the duration of one call and closes it on drop,
/// whichever way the call exits.
pub struct CursorGuard {
    cursor: Box<dyn Cursor>,
}

impl CursorGuard {
    pub fn new(cursor: Box<dyn Cursor>) -> Self {
        Self { cursor }
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        self.cursor.columns()
    }

    pub async fn next_row(&mut self) -> Result<Option<Row>> {
        self.cursor.next_row().await
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        trace!("Closing cursor");
        self.cursor.close();
    }
}
