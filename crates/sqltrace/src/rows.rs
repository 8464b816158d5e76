//! Instrumented result-set cursor.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqltrace_driver::{
    ColumnTypeDatabaseTypeName, ColumnTypeLength, ColumnTypeNullable, ColumnTypePrecisionScale,
    ColumnTypeScanType, Context, Error, Result, Rows, RowsNextResultSet, ScanType, StepResult,
    Value,
};

use crate::observer::Observer;

/// Cursor whose `next` and `close` are timed and reported under the context
/// of the exec/query that opened it. Metadata and multi-result-set
/// capabilities are forwarded when the driver's cursor has them.
pub struct TracedRows {
    observer: Arc<dyn Observer>,
    ctx: Context,
    rows: Box<dyn Rows>,
}

impl TracedRows {
    pub(crate) fn new(observer: Arc<dyn Observer>, ctx: Context, rows: Box<dyn Rows>) -> Self {
        Self { observer, ctx, rows }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn columns(&self) -> &[String] {
        self.rows.columns()
    }

    pub async fn close(&mut self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.rows.close().await;
        let elapsed = started.elapsed();

        self.observer
            .rows_close(&self.ctx, outcome.as_ref().err(), elapsed);
        outcome
    }

    /// Scan the next row into `dest`. End of data is `Ok(StepResult::Done)`.
    pub async fn next(&mut self, dest: &mut [Value]) -> Result<StepResult> {
        let started = Instant::now();
        let outcome = self.rows.next(dest).await;
        let elapsed = started.elapsed();

        self.observer
            .rows_next(&self.ctx, dest, outcome.as_ref().copied(), elapsed);
        outcome
    }

    pub fn has_next_result_set(&mut self) -> bool {
        self.rows
            .as_next_result_set()
            .is_some_and(|rows| rows.has_next_result_set())
    }

    pub async fn next_result_set(&mut self) -> Result<()> {
        match self.rows.as_next_result_set() {
            Some(rows) => rows.next_result_set().await,
            None => Err(Error::NoMoreResultSets),
        }
    }

    pub fn column_type_scan_type(&self, index: usize) -> ScanType {
        self.rows
            .as_scan_type()
            .map_or(ScanType::Any, |rows| rows.column_type_scan_type(index))
    }

    pub fn column_type_database_type_name(&self, index: usize) -> String {
        self.rows
            .as_database_type_name()
            .map(|rows| rows.column_type_database_type_name(index))
            .unwrap_or_default()
    }

    pub fn column_type_length(&self, index: usize) -> Option<u64> {
        self.rows
            .as_length()
            .and_then(|rows| rows.column_type_length(index))
    }

    pub fn column_type_nullable(&self, index: usize) -> Option<bool> {
        self.rows
            .as_nullable()
            .and_then(|rows| rows.column_type_nullable(index))
    }

    pub fn column_type_precision_scale(&self, index: usize) -> Option<(u64, u64)> {
        self.rows
            .as_precision_scale()
            .and_then(|rows| rows.column_type_precision_scale(index))
    }
}

#[async_trait]
impl Rows for TracedRows {
    fn columns(&self) -> &[String] {
        TracedRows::columns(self)
    }

    async fn close(&mut self) -> Result<()> {
        TracedRows::close(self).await
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<StepResult> {
        TracedRows::next(self, dest).await
    }

    fn as_next_result_set(&mut self) -> Option<&mut dyn RowsNextResultSet> {
        Some(self)
    }

    fn as_scan_type(&self) -> Option<&dyn ColumnTypeScanType> {
        Some(self)
    }

    fn as_database_type_name(&self) -> Option<&dyn ColumnTypeDatabaseTypeName> {
        Some(self)
    }

    fn as_length(&self) -> Option<&dyn ColumnTypeLength> {
        Some(self)
    }

    fn as_nullable(&self) -> Option<&dyn ColumnTypeNullable> {
        Some(self)
    }

    fn as_precision_scale(&self) -> Option<&dyn ColumnTypePrecisionScale> {
        Some(self)
    }
}

#[async_trait]
impl RowsNextResultSet for TracedRows {
    fn has_next_result_set(&mut self) -> bool {
        TracedRows::has_next_result_set(self)
    }

    async fn next_result_set(&mut self) -> Result<()> {
        TracedRows::next_result_set(self).await
    }
}

impl ColumnTypeScanType for TracedRows {
    fn column_type_scan_type(&self, index: usize) -> ScanType {
        TracedRows::column_type_scan_type(self, index)
    }
}

impl ColumnTypeDatabaseTypeName for TracedRows {
    fn column_type_database_type_name(&self, index: usize) -> String {
        TracedRows::column_type_database_type_name(self, index)
    }
}

impl ColumnTypeLength for TracedRows {
    fn column_type_length(&self, index: usize) -> Option<u64> {
        TracedRows::column_type_length(self, index)
    }
}

impl ColumnTypeNullable for TracedRows {
    fn column_type_nullable(&self, index: usize) -> Option<bool> {
        TracedRows::column_type_nullable(self, index)
    }
}

impl ColumnTypePrecisionScale for TracedRows {
    fn column_type_precision_scale(&self, index: usize) -> Option<(u64, u64)> {
        TracedRows::column_type_precision_scale(self, index)
    }
}

impl std::fmt::Debug for TracedRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedRows")
            .field("columns", &self.rows.columns())
            .finish_non_exhaustive()
    }
}
