//! Record types and their field-to-column tables.
//!
//! A [`Record`] lists its bindable fields once, at compile time, through
//! [`Record::fields`]. Each field either maps to a column (its own name, or an
//! explicit override) or is ignored. The [`record!`](crate::record!) macro
//! generates the table from a compact annotation list:
//!
//! ```
//! use rowscan::record;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     login_count: u32,
//!     session_token: Option<String>,
//! }
//!
//! record!(User {
//!     id,
//!     name => "user_name",
//!     login_count,
//!     session_token => ignore,
//! });
//! ```

use crate::convert::ValueError;
use crate::db::Value;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stores one column value into a field of `T`.
pub type Setter<T> = fn(&mut T, Value) -> std::result::Result<(), ValueError>;

/// A record type that rows can be scanned into.
///
/// One fresh `Self::default()` is allocated per row.
pub trait Record: Default + Send {
    /// The declared fields, in declaration order.
    fn fields() -> Vec<Field<Self>>;
}

/// One declared field of a record.
pub struct Field<T> {
    name: &'static str,
    binding: FieldBinding<T>,
}

enum FieldBinding<T> {
    Column {
        column: &'static str,
        setter: Setter<T>,
    },
    Ignored,
}

impl<T> Field<T> {
    /// A field bound to the column of the same name.
    pub fn new(name: &'static str, setter: Setter<T>) -> Self {
        Self::column(name, name, setter)
    }

    /// A field bound to an explicitly named column.
    pub fn column(name: &'static str, column: &'static str, setter: Setter<T>) -> Self {
        Self {
            name,
            binding: FieldBinding::Column { column, setter },
        }
    }

    /// A field that is never bound, even if a same-named column exists.
    pub fn ignored(name: &'static str) -> Self {
        Self {
            name,
            binding: FieldBinding::Ignored,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The resolved column name, or `None` for an ignored field.
    pub fn column_name(&self) -> Option<&'static str> {
        match self.binding {
            FieldBinding::Column { column, .. } => Some(column),
            FieldBinding::Ignored => None,
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.binding, FieldBinding::Ignored)
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("column", &self.column_name())
            .finish()
    }
}

/// How a field's column name is compared with result column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatch {
    /// Names match when equal ignoring ASCII case (`UserName` matches `username`).
    #[default]
    IgnoreAsciiCase,
    /// Names match only when byte-for-byte equal.
    Exact,
}

impl ColumnMatch {
    pub fn matches(self, field_column: &str, result_column: &str) -> bool {
        match self {
            Self::IgnoreAsciiCase => field_column.eq_ignore_ascii_case(result_column),
            Self::Exact => field_column == result_column,
        }
    }
}

/// A non-ignored field with its resolved column.
pub struct BoundField<T> {
    pub name: &'static str,
    pub column: &'static str,
    setter: Setter<T>,
}

impl<T> BoundField<T> {
    pub(crate) fn assign(&self, record: &mut T, value: Value) -> std::result::Result<(), ValueError> {
        (self.setter)(record, value)
    }
}

/// The per-call view of a record type: bindable fields in declaration order
/// plus the names of ignored fields.
pub struct RecordDescriptor<T> {
    type_name: &'static str,
    fields: Vec<BoundField<T>>,
    ignored: Vec<&'static str>,
}

impl<T: Record> RecordDescriptor<T> {
    /// Builds the descriptor from `T::fields()`.
    pub fn of() -> Self {
        let mut fields = Vec::new();
        let mut ignored = Vec::new();

        for field in T::fields() {
            match field.binding {
                FieldBinding::Column { column, setter } => fields.push(BoundField {
                    name: field.name,
                    column,
                    setter,
                }),
                FieldBinding::Ignored => ignored.push(field.name),
            }
        }

        Self {
            type_name: std::any::type_name::<T>(),
            fields,
            ignored,
        }
    }
}

impl<T> RecordDescriptor<T> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Fields that must be covered by the result columns.
    pub fn fields(&self) -> &[BoundField<T>] {
        &self.fields
    }

    pub fn ignored(&self) -> &[&'static str] {
        &self.ignored
    }

    /// Checks that the table describes a usable aggregate: at least one
    /// declared field, non-empty column names, and no two bound fields
    /// resolving to the same column under `matcher`.
    pub fn validate(&self, matcher: ColumnMatch) -> Result<()> {
        if self.fields.is_empty() && self.ignored.is_empty() {
            return Err(Error::shape(format!(
                "record type {} declares no fields",
                self.type_name
            )));
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.column.is_empty() {
                return Err(Error::shape(format!(
                    "field `{}` of {} maps to an empty column name",
                    field.name, self.type_name
                )));
            }
            if let Some(other) = self.fields[..i]
                .iter()
                .find(|other| matcher.matches(other.column, field.column))
            {
                return Err(Error::shape(format!(
                    "fields `{}` and `{}` of {} both map to column \"{}\"",
                    other.name, field.name, self.type_name, field.column
                )));
            }
        }

        Ok(())
    }
}

/// Implements [`Record`] for a struct from a list of its fields.
///
/// Each entry is a field name, optionally followed by `=> "column"` to bind a
/// differently named column or `=> ignore` to exclude the field. Bound fields
/// must implement [`FromValue`](crate::FromValue).
#[macro_export]
macro_rules! record {
    (@field $field:ident => ignore) => {
        $crate::Field::ignored(stringify!($field))
    };
    (@field $field:ident => $column:literal) => {
        $crate::Field::column(stringify!($field), $column, |record: &mut Self, value| {
            record.$field = $crate::FromValue::from_value(value)?;
            Ok(())
        })
    };
    (@field $field:ident) => {
        $crate::Field::new(stringify!($field), |record: &mut Self, value| {
            record.$field = $crate::FromValue::from_value(value)?;
            Ok(())
        })
    };
    ($record:ty { $($field:ident $(=> $spec:tt)?),* $(,)? }) => {
        impl $crate::Record for $record {
            fn fields() -> ::std::vec::Vec<$crate::Field<Self>> {
                ::std::vec![$($crate::record!(@field $field $(=> $spec)?)),*]
            }
        }
    };
}
