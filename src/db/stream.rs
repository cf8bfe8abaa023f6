//! Channel-backed cursor for the sqlx executors.
//!
//! The executor spawns a task that drives the sqlx row stream and forwards
//! converted rows over a bounded channel. Closing the cursor closes the
//! channel, so the task stops at its next send and the connection goes back
//! to the pool.

use super::{ColumnInfo, Cursor, Row};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Rows buffered between the fetch task and the cursor.
const ROW_BUFFER: usize = 64;

/// One fetched row. Only the first row of a result carries the columns.
#[derive(Debug)]
pub(crate) struct Fetched {
    columns: Option<Vec<ColumnInfo>>,
    row: Row,
}

/// Why the fetch task stopped early.
#[derive(Debug)]
pub(crate) enum Failure {
    /// The database rejected the query or broke off the stream.
    Database(String),
    /// A fetched value could not be converted; already carries its column.
    Decode(Error),
}

type Message = std::result::Result<Fetched, Failure>;

/// Producer half, owned by the fetch task.
pub(crate) struct RowSender {
    tx: mpsc::Sender<Message>,
    sent_columns: bool,
}

impl RowSender {
    /// Sends a row. Returns false once the cursor has been closed.
    pub(crate) async fn send_row(
        &mut self,
        columns: impl FnOnce() -> Vec<ColumnInfo>,
        row: Row,
    ) -> bool {
        let columns = if self.sent_columns {
            None
        } else {
            self.sent_columns = true;
            Some(columns())
        };
        self.tx.send(Ok(Fetched { columns, row })).await.is_ok()
    }

    /// Reports a database failure. A failure before any row means the query
    /// itself was rejected.
    pub(crate) async fn send_error(&mut self, message: String) {
        // Nobody to tell if the cursor is already gone
        let _ = self.tx.send(Err(Failure::Database(message))).await;
    }

    /// Reports a value that could not be converted. Surfaces from the
    /// cursor's `next_row`, never from opening it.
    pub(crate) async fn send_decode_error(&mut self, error: Error) {
        let _ = self.tx.send(Err(Failure::Decode(error))).await;
    }
}

pub(crate) fn channel() -> (RowSender, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(ROW_BUFFER);
    (
        RowSender {
            tx,
            sent_columns: false,
        },
        rx,
    )
}

/// Consumer half, handed to the select pipeline.
pub(crate) struct ChannelCursor {
    columns: Vec<ColumnInfo>,
    pending: Option<Result<Row>>,
    receiver: mpsc::Receiver<Message>,
    done: bool,
}

impl ChannelCursor {
    /// Waits for the first message so that a rejected query surfaces here as
    /// an execution error rather than from the first fetch.
    pub(crate) async fn open(mut receiver: mpsc::Receiver<Message>) -> Result<Self> {
        let (columns, pending, done) = match receiver.recv().await {
            None => (Vec::new(), None, true),
            Some(Err(Failure::Database(message))) => return Err(Error::execution(message)),
            Some(Err(Failure::Decode(error))) => (Vec::new(), Some(Err(error)), true),
            Some(Ok(first)) => (first.columns.unwrap_or_default(), Some(Ok(first.row)), false),
        };

        Ok(Self {
            columns,
            pending,
            receiver,
            done,
        })
    }
}

#[async_trait]
impl Cursor for ChannelCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    async fn next_row(&mut self) -> Result<Option<Row>> {
        if let Some(first) = self.pending.take() {
            return first.map(Some);
        }
        if self.done {
            return Ok(None);
        }

        match self.receiver.recv().await {
            Some(Ok(fetched)) => Ok(Some(fetched.row)),
            Some(Err(failure)) => {
                self.done = true;
                Err(match failure {
                    Failure::Database(message) => Error::iteration(message),
                    Failure::Decode(error) => error,
                })
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.done = true;
        self.pending = None;
        self.receiver.close();
    }
}
