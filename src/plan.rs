//! Binding plans: which result column feeds which record field.
//!
//! A [`BindingPlan`] is computed once per call from a record descriptor and
//! the cursor's column set. For every row the assembler allocates a fresh
//! record and instantiates the plan against it as [`ScanTargets`].

use crate::db::{ColumnInfo, Row};
use crate::error::{Error, Result};
use crate::record::{ColumnMatch, RecordDescriptor};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Store the column into the descriptor field at this index.
    Bind(usize),
    /// Read the column and drop it.
    Discard,
}

/// Per-column scan decisions for one (record type, column set) pair.
pub struct BindingPlan<T> {
    descriptor: RecordDescriptor<T>,
    columns: Vec<String>,
    targets: Vec<Target>,
}

impl<T> BindingPlan<T> {
    /// Matches every bound field of `descriptor` against `columns`.
    ///
    /// Columns without a matching field are discarded. A bound field with no
    /// matching column fails with [`Error::Binding`]. When the result repeats
    /// a column name, the first occurrence binds and the rest are discarded.
    pub fn build(
        descriptor: RecordDescriptor<T>,
        columns: &[ColumnInfo],
        matcher: ColumnMatch,
    ) -> Result<Self> {
        let mut targets = vec![Target::Discard; columns.len()];

        for (field_index, field) in descriptor.fields().iter().enumerate() {
            let position = columns
                .iter()
                .position(|col| matcher.matches(field.column, &col.name))
                .ok_or_else(|| Error::binding(field.name, field.column))?;
            targets[position] = Target::Bind(field_index);
        }

        let plan = Self {
            descriptor,
            columns: columns.iter().map(|col| col.name.clone()).collect(),
            targets,
        };

        debug!(
            record = plan.descriptor.type_name(),
            bound = ?plan.bound_columns(),
            discarded = ?plan.discarded_columns(),
            "Built binding plan"
        );

        Ok(plan)
    }

    /// Result columns that feed a field, in column order.
    pub fn bound_columns(&self) -> Vec<&str> {
        self.columns_where(|t| matches!(t, Target::Bind(_)))
    }

    /// Result columns that are read and dropped, in column order.
    pub fn discarded_columns(&self) -> Vec<&str> {
        self.columns_where(|t| matches!(t, Target::Discard))
    }

    fn columns_where(&self, pred: impl Fn(&Target) -> bool) -> Vec<&str> {
        self.columns
            .iter()
            .zip(&self.targets)
            .filter(|(_, target)| pred(target))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Instantiates the plan against a freshly allocated record.
    pub fn targets<'r>(&'r self, record: &'r mut T) -> ScanTargets<'r, T> {
        ScanTargets { plan: self, record }
    }
}

/// Concrete scan targets for one row: the plan applied to one record.
pub struct ScanTargets<'r, T> {
    plan: &'r BindingPlan<T>,
    record: &'r mut T,
}

impl<T> ScanTargets<'_, T> {
    /// Writes the row's values into the record, column by column.
    ///
    /// Stops at the first value that cannot be stored; fields already written
    /// keep their values.
    pub fn scan(self, row: Row) -> Result<()> {
        let plan = self.plan;
        if row.len() != plan.targets.len() {
            return Err(Error::scan(
                "*",
                format!(
                    "row has {} values but the result has {} columns",
                    row.len(),
                    plan.targets.len()
                ),
            ));
        }

        for ((value, target), column) in row.into_iter().zip(&plan.targets).zip(&plan.columns) {
            match *target {
                Target::Bind(field_index) => {
                    let field = &plan.descriptor.fields()[field_index];
                    field
                        .assign(self.record, value)
                        .map_err(|e| Error::scan(column.as_str(), e.to_string()))?;
                }
                Target::Discard => drop(value),
            }
        }

        Ok(())
    }
}
