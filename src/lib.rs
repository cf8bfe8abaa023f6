//! rowscan - map SQL query results onto plain Rust records.
//!
//! A [`Session`] runs a SQL template through an [`Interpolate`] step and an
//! [`Executor`], then binds every returned row onto a [`Record`] by matching
//! result column names against the record's field table:
//!
//! - [`Session::select_all`] fills a `Vec` or a keyed map, one record per row.
//! - [`Session::select_one`] fills a single record from the first row.
//!
//! Record types describe their fields with the [`record!`] macro.

pub mod config;
pub mod convert;
pub mod db;
pub mod destination;
pub mod diagnostics;
pub mod error;
pub mod interpolate;
pub mod logging;
pub mod plan;
pub mod record;
pub mod session;

pub use config::{Config, ConnectionConfig, SessionConfig};
pub use convert::{FromValue, ValueError};
pub use db::{ColumnInfo, Cursor, Executor, ResultSet, Row, Value};
pub use destination::{Destination, KeyedCollection, RecordSink, Shape};
pub use diagnostics::{Diagnostics, MemoryDiagnostics, TracingDiagnostics};
pub use error::{Error, Result, SelectError};
pub use interpolate::{Interpolate, PlaceholderInterpolator};
pub use record::{ColumnMatch, Field, Record, RecordDescriptor};
pub use session::Session;
