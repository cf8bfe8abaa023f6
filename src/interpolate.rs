//! Merging SQL templates with parameter values.
//!
//! The select pipeline only needs the [`Interpolate`] trait; the
//! [`PlaceholderInterpolator`] is the default implementation for `?`
//! placeholders.

use crate::db::Value;
use crate::error::{Error, Result};

/// Turns a SQL template plus parameters into literal, executable SQL.
pub trait Interpolate: Send + Sync {
    fn interpolate(&self, template: &str, params: &[Value]) -> Result<String>;
}

/// Replaces each `?` outside a quoted literal with the next parameter,
/// rendered as a SQL literal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderInterpolator;

impl Interpolate for PlaceholderInterpolator {
    fn interpolate(&self, template: &str, params: &[Value]) -> Result<String> {
        let mut sql = String::with_capacity(template.len() + params.len() * 8);
        let mut params_iter = params.iter();
        let mut quote: Option<char> = None;
        let mut used = 0usize;

        for ch in template.chars() {
            match (ch, quote) {
                ('\'' | '"', None) => {
                    quote = Some(ch);
                    sql.push(ch);
                }
                // A doubled quote reopens immediately, so toggling handles escapes
                (c, Some(open)) if c == open => {
                    quote = None;
                    sql.push(ch);
                }
                ('?', None) => {
                    let value = params_iter.next().ok_or_else(|| {
                        Error::interpolation(format!(
                            "template has more placeholders than the {} parameters given",
                            params.len()
                        ))
                    })?;
                    write_literal(&mut sql, value)?;
                    used += 1;
                }
                _ => sql.push(ch),
            }
        }

        if used < params.len() {
            return Err(Error::interpolation(format!(
                "template has {used} placeholders but {} parameters were given",
                params.len()
            )));
        }

        Ok(sql)
    }
}

fn write_literal(sql: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Null => sql.push_str("NULL"),
        Value::Bool(true) => sql.push_str("TRUE"),
        Value::Bool(false) => sql.push_str("FALSE"),
        Value::Int(i) => sql.push_str(&i.to_string()),
        Value::Float(f) if f.is_finite() => sql.push_str(&format!("{f:?}")),
        Value::Float(f) => {
            return Err(Error::interpolation(format!(
                "{f} has no SQL literal form"
            )))
        }
        Value::String(s) => {
            sql.push('\'');
            sql.push_str(&s.replace('\'', "''"));
            sql.push('\'');
        }
        Value::Bytes(_) => {
            return Err(Error::interpolation(
                "binary parameters have no portable SQL literal form",
            ))
        }
    }
    Ok(())
}
