use async_trait::async_trait;
use sqltrace_driver::{
    ColumnTypeDatabaseTypeName, ColumnTypeScanType, Error, Result, Rows, ScanType, StepResult,
    Value,
};

use crate::value::{from_libsql, scan_type_for};

/// Cursor over a libsql result set.
///
/// Rows produced by a prepared statement also know the declared type of
/// each column; rows from direct queries do not.
pub struct LibsqlRows {
    rows: Option<libsql::Rows>,
    columns: Vec<String>,
    decl_types: Option<Vec<String>>,
}

impl LibsqlRows {
    pub(crate) fn new(rows: libsql::Rows, decl_types: Option<Vec<String>>) -> Self {
        let columns = (0..rows.column_count())
            .map(|idx| rows.column_name(idx).unwrap_or_default().to_string())
            .collect();
        Self {
            rows: Some(rows),
            columns,
            decl_types,
        }
    }

    fn decl_type(&self, index: usize) -> Option<&str> {
        self.decl_types
            .as_ref()
            .and_then(|types| types.get(index))
            .map(String::as_str)
    }
}

#[async_trait]
impl Rows for LibsqlRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn close(&mut self) -> Result<()> {
        self.rows = None;
        Ok(())
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<StepResult> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(StepResult::Done);
        };
        let Some(row) = rows.next().await.map_err(Error::driver)? else {
            return Ok(StepResult::Done);
        };

        for (idx, slot) in dest.iter_mut().enumerate().take(self.columns.len()) {
            let idx = i32::try_from(idx).map_err(Error::driver)?;
            *slot = from_libsql(row.get_value(idx).map_err(Error::driver)?);
        }
        Ok(StepResult::Row)
    }

    fn as_scan_type(&self) -> Option<&dyn ColumnTypeScanType> {
        self.decl_types.as_ref().map(|_| self as &dyn ColumnTypeScanType)
    }

    fn as_database_type_name(&self) -> Option<&dyn ColumnTypeDatabaseTypeName> {
        self.decl_types
            .as_ref()
            .map(|_| self as &dyn ColumnTypeDatabaseTypeName)
    }
}

impl ColumnTypeScanType for LibsqlRows {
    fn column_type_scan_type(&self, index: usize) -> ScanType {
        self.decl_type(index).map_or(ScanType::Any, scan_type_for)
    }
}

impl ColumnTypeDatabaseTypeName for LibsqlRows {
    fn column_type_database_type_name(&self, index: usize) -> String {
        self.decl_type(index)
            .map(str::to_ascii_uppercase)
            .unwrap_or_default()
    }
}
