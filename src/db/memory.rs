//! In-memory executor for testing and embedding.
//!
//! Serves canned result sets keyed by SQL text, with optional injected
//! failures, and keeps count of the cursors it opens and closes.

use super::{ColumnInfo, Cursor, Executor, ResultSet, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the executor does when it receives a given SQL text.
#[derive(Debug, Clone)]
pub enum ScriptedResult {
    /// Returns the rows.
    Rows(ResultSet),
    /// Rejects the query at submission.
    QueryError(String),
    /// Yields `after` rows of the result, then fails the next fetch.
    FailAfter {
        result: ResultSet,
        after: usize,
        message: String,
    },
}

/// An executor that returns predefined results.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    scripts: HashMap<String, ScriptedResult>,
    executed: Mutex<Vec<String>>,
    counters: Arc<CursorCounters>,
}

#[derive(Debug, Default)]
struct CursorCounters {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MemoryExecutor {
    /// Creates an executor with no registered queries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result returned for `sql`.
    pub fn with_result(mut self, sql: impl Into<String>, result: ResultSet) -> Self {
        self.scripts.insert(sql.into(), ScriptedResult::Rows(result));
        self
    }

    /// Makes `sql` fail at submission.
    pub fn with_query_error(mut self, sql: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts
            .insert(sql.into(), ScriptedResult::QueryError(message.into()));
        self
    }

    /// Makes `sql` yield `after` rows of `result`, then fail.
    pub fn with_iteration_error(
        mut self,
        sql: impl Into<String>,
        result: ResultSet,
        after: usize,
        message: impl Into<String>,
    ) -> Self {
        self.scripts.insert(
            sql.into(),
            ScriptedResult::FailAfter {
                result,
                after,
                message: message.into(),
            },
        );
        self
    }

    /// SQL texts received so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of cursors opened so far.
    pub fn opened_cursors(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Number of cursors closed so far.
    pub fn closed_cursors(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    fn record(&self, sql: &str) {
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sql.to_string());
    }
}

#[async_trait]
impl Executor for MemoryExecutor {
    async fn query(&self, sql: &str) -> Result<Box<dyn Cursor>> {
        self.record(sql);

        let (result, failure) = match self.scripts.get(sql) {
            Some(ScriptedResult::Rows(result)) => (result.clone(), None),
            Some(ScriptedResult::QueryError(message)) => {
                return Err(Error::execution(message.clone()))
            }
            Some(ScriptedResult::FailAfter {
                result,
                after,
                message,
            }) => (result.clone(), Some((*after, message.clone()))),
            None => {
                return Err(Error::execution(format!(
                    "no result registered for query: {sql}"
                )))
            }
        };

        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemoryCursor {
            columns: result.columns,
            rows: result.rows.into(),
            failure,
            closed: false,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct MemoryCursor {
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Row>,
    failure: Option<(usize, String)>,
    closed: bool,
    counters: Arc<CursorCounters>,
}

#[async_trait]
impl Cursor for MemoryCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        if self.closed {
            return Err(Error::iteration("cursor is closed"));
        }

        if let Some((remaining, message)) = &mut self.failure {
            if *remaining == 0 {
                let message = std::mem::take(message);
                self.failure = None;
                self.rows.clear();
                return Err(Error::iteration(message));
            }
            *remaining -= 1;
        }

        Ok(self.rows.pop_front())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.rows.clear();
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
