//! Select calls: the pipeline from SQL template to stored records.
//!
//! Each call runs `validate → interpolate → execute → iterate`. The cursor is
//! owned by a [`CursorGuard`] and the timing by a drop guard, so both are
//! released on every exit path, including early returns through `?`.

use crate::config::SessionConfig;
use crate::db::{CursorGuard, Executor, Value};
use crate::destination::{inspect, Destination, Inspection, Shape};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{Error, Result, SelectError};
use crate::interpolate::{Interpolate, PlaceholderInterpolator};
use crate::plan::BindingPlan;
use crate::record::Record;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Maps query results onto records.
///
/// A session holds only shared, immutable collaborators; concurrent calls on
/// one session do not interact.
#[derive(Clone)]
pub struct Session {
    executor: Arc<dyn Executor>,
    interpolator: Arc<dyn Interpolate>,
    diagnostics: Arc<dyn Diagnostics>,
    config: SessionConfig,
    error_metric: String,
}

impl Session {
    /// Creates a session with default settings, `?` placeholders, and
    /// diagnostics logged through `tracing`.
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::from_config(executor, &SessionConfig::default())
    }

    /// Creates a session from loaded configuration.
    pub fn from_config(executor: Arc<dyn Executor>, config: &SessionConfig) -> Self {
        let mut diagnostics = TracingDiagnostics::new();
        if let Some(ms) = config.slow_query_ms {
            diagnostics = diagnostics.with_slow_query_threshold(Duration::from_millis(ms));
        }

        Self {
            executor,
            interpolator: Arc::new(PlaceholderInterpolator),
            diagnostics: Arc::new(diagnostics),
            error_metric: format!("{}.query_error", config.timing_name),
            config: config.clone(),
        }
    }

    pub fn with_interpolator(mut self, interpolator: Arc<dyn Interpolate>) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs a query and stores one record per row into a sequence or mapping
    /// destination.
    ///
    /// Existing entries are never cleared. On failure the records stored so
    /// far stay in the destination and [`SelectError::rows_processed`] counts
    /// them. For a mapping, the count includes rows whose record was later
    /// overwritten by a row with the same key.
    pub async fn select_all<T: Record>(
        &self,
        mut destination: Destination<'_, T>,
        sql: &str,
        params: &[Value],
    ) -> std::result::Result<usize, SelectError> {
        let Inspection { descriptor, .. } = inspect(
            &destination,
            "select_all",
            &[Shape::Sequence, Shape::Mapping],
            self.config.column_match,
        )?;

        let mut timing = self.start_timing(sql);
        let full_sql = self.interpolator.interpolate(sql, params)?;
        timing.set_sql(&full_sql);

        let mut cursor = self.open(&full_sql).await?;

        // Columns are only known once the first row is in
        let Some(mut row) = cursor.next_row().await? else {
            debug!(sql = %full_sql, "select_all returned no rows");
            return Ok(0);
        };
        let plan = BindingPlan::build(descriptor, cursor.columns(), self.config.column_match)?;

        let mut rows = 0;
        loop {
            let mut record = T::default();
            plan.targets(&mut record)
                .scan(row)
                .map_err(|e| SelectError::new(rows, e))?;
            destination.store(record);
            rows += 1;

            row = match cursor.next_row().await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => return Err(SelectError::new(rows, e)),
            };
        }

        debug!(sql = %full_sql, rows, "select_all finished");
        Ok(rows)
    }

    /// Runs a query and fills a single record from its first row.
    ///
    /// Returns `Ok(false)` when the query returns no rows; that is an
    /// ordinary outcome, not an error. Rows after the first are never read.
    /// Bound fields are written in place, so a scan error can leave the
    /// record partially updated; ignored fields are never touched.
    pub async fn select_one<T: Record>(
        &self,
        mut destination: Destination<'_, T>,
        sql: &str,
        params: &[Value],
    ) -> Result<bool> {
        let Inspection { descriptor, .. } = inspect(
            &destination,
            "select_one",
            &[Shape::Single],
            self.config.column_match,
        )?;

        let mut timing = self.start_timing(sql);
        let full_sql = self.interpolator.interpolate(sql, params)?;
        timing.set_sql(&full_sql);

        let mut cursor = self.open(&full_sql).await?;

        let Some(row) = cursor.next_row().await? else {
            debug!(sql = %full_sql, "select_one found no row");
            return Ok(false);
        };
        let plan = BindingPlan::build(descriptor, cursor.columns(), self.config.column_match)?;

        let record = destination
            .single_mut()
            .ok_or_else(|| Error::shape("select_one needs a single record destination"))?;
        plan.targets(record).scan(row)?;

        Ok(true)
    }

    async fn open(&self, sql: &str) -> Result<CursorGuard> {
        match self.executor.query(sql).await {
            Ok(cursor) => Ok(CursorGuard::new(cursor)),
            Err(e) => {
                self.diagnostics
                    .record_error(&self.error_metric, &e, &[("sql", sql)]);
                Err(e)
            }
        }
    }

    fn start_timing(&self, template: &str) -> TimingGuard<'_> {
        TimingGuard {
            diagnostics: self.diagnostics.as_ref(),
            name: &self.config.timing_name,
            started: Instant::now(),
            sql: template.to_string(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Reports the elapsed time of one call when dropped.
///
/// Tagged with the template until interpolation succeeds, then with the
/// final SQL.
struct TimingGuard<'s> {
    diagnostics: &'s dyn Diagnostics,
    name: &'s str,
    started: Instant,
    sql: String,
}

impl TimingGuard<'_> {
    fn set_sql(&mut self, sql: &str) {
        self.sql = sql.to_string();
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        let nanos = u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.diagnostics
            .record_timing(self.name, nanos, &[("sql", self.sql.as_str())]);
    }
}
