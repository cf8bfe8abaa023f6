//! Conversion from database values into record field types.

use crate::db::Value;
use thiserror::Error;

/// Why a value could not be stored into a field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("unexpected NULL for non-optional {0}")]
    UnexpectedNull(&'static str),

    #[error("cannot convert {found} into {target}")]
    Mismatch {
        found: &'static str,
        target: &'static str,
    },

    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },
}

/// A type that a result column can be scanned into.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Ok(s),
            Value::Null => Err(ValueError::UnexpectedNull("String")),
            other => Err(ValueError::Mismatch {
                found: other.kind(),
                target: "String",
            }),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::String(s) => Ok(s.into_bytes()),
            Value::Null => Err(ValueError::UnexpectedNull("Vec<u8>")),
            other => Err(ValueError::Mismatch {
                found: other.kind(),
                target: "Vec<u8>",
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            // SQLite has no boolean storage class
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            Value::Int(i) => Err(ValueError::OutOfRange {
                value: i.to_string(),
                target: "bool",
            }),
            Value::Null => Err(ValueError::UnexpectedNull("bool")),
            other => Err(ValueError::Mismatch {
                found: other.kind(),
                target: "bool",
            }),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Null => Err(ValueError::UnexpectedNull("f64")),
            other => Err(ValueError::Mismatch {
                found: other.kind(),
                target: "f64",
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Err(ValueError::UnexpectedNull("f32")),
            other => f64::from_value(other).map(|f| f as f32),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),* $(,)?) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i).map_err(|_| ValueError::OutOfRange {
                            value: i.to_string(),
                            target: stringify!($t),
                        }),
                        Value::Null => Err(ValueError::UnexpectedNull(stringify!($t))),
                        other => Err(ValueError::Mismatch {
                            found: other.kind(),
                            target: stringify!($t),
                        }),
                    }
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);
