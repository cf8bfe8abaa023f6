//! Error types for rowscan.
//!
//! Defines the error enum shared by every stage of a select call, plus
//! [`SelectError`], which carries the partial row count of a failed
//! `select_all`.

use thiserror::Error;

/// Main error type for rowscan operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The destination cannot hold records of this shape.
    ///
    /// Never triggered by correct callers: it signals a programming mistake,
    /// such as passing a single record to `select_all`.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Merging the SQL template with its parameters failed.
    #[error("Interpolation error: {0}")]
    Interpolation(String),

    /// The executor rejected the query.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A declared, non-ignored field has no matching result column.
    #[error("Binding error: field `{field}` requires column \"{column}\", which the query did not return")]
    Binding { field: String, column: String },

    /// A column value could not be stored into its field.
    #[error("Scan error in column \"{column}\": {message}")]
    Scan { column: String, message: String },

    /// The cursor failed while fetching the next row.
    #[error("Iteration error: {0}")]
    Iteration(String),

    /// Configuration errors (invalid config file, bad connection string, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Creates a shape error with the given message.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Creates an interpolation error with the given message.
    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a binding error for a field whose column is missing.
    pub fn binding(field: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Binding {
            field: field.into(),
            column: column.into(),
        }
    }

    /// Creates a scan error for the given column.
    pub fn scan(column: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Scan {
            column: column.into(),
            message: msg.into(),
        }
    }

    /// Creates an iteration error with the given message.
    pub fn iteration(msg: impl Into<String>) -> Self {
        Self::Iteration(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Shape(_) => "Shape Error",
            Self::Interpolation(_) => "Interpolation Error",
            Self::Execution(_) => "Execution Error",
            Self::Binding { .. } => "Binding Error",
            Self::Scan { .. } => "Scan Error",
            Self::Iteration(_) => "Iteration Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// A failed `select_all` call.
///
/// Records stored before the failure stay in the destination, and
/// `rows_processed` counts them.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} (after {rows_processed} rows)")]
pub struct SelectError {
    /// Rows fully scanned and stored before the failure.
    pub rows_processed: usize,

    /// The first error encountered.
    #[source]
    pub error: Error,
}

impl SelectError {
    pub fn new(rows_processed: usize, error: Error) -> Self {
        Self {
            rows_processed,
            error,
        }
    }

    /// Discards the row count and returns the underlying error.
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl From<Error> for SelectError {
    fn from(error: Error) -> Self {
        Self::new(0, error)
    }
}
