//! Driver traits.
//!
//! The baseline traits ([`Conn`], [`Stmt`], [`Rows`], [`Tx`], [`ExecResult`])
//! carry only what every driver must provide. Optional capabilities live in
//! their own small traits and are discovered at runtime through the `as_*`
//! probes, which default to `None`. A driver opts in by implementing the
//! capability trait and overriding the matching probe to return `Some(self)`.

use async_trait::async_trait;

use crate::context::Context;
use crate::value::{NamedValue, ScanType, StepResult, TxOptions, Value, ValueConverter};
use crate::Result;

/// Opens connections from a data-source string.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>>;
}

/// Produces connections from a fixed configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>>;

    fn driver(&self) -> &dyn Driver;
}

/// A single driver connection. Not expected to be shared between callers.
#[async_trait]
pub trait Conn: Send {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>>;

    async fn close(&mut self) -> Result<()>;

    async fn begin(&mut self) -> Result<Box<dyn Tx>>;

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        None
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        None
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        None
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        None
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        None
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        None
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        None
    }

    fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
        None
    }

    fn as_validator(&self) -> Option<&dyn Validator> {
        None
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        None
    }
}

#[async_trait]
pub trait ConnBeginTx: Send {
    async fn begin_tx(&mut self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>>;
}

#[async_trait]
pub trait ConnPrepareContext: Send {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>>;
}

/// Direct execution without a prepared statement.
#[async_trait]
pub trait Execer: Send {
    async fn exec(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>>;
}

#[async_trait]
pub trait ExecerContext: Send {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>>;
}

/// Direct query without a prepared statement.
#[async_trait]
pub trait Queryer: Send {
    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>>;
}

#[async_trait]
pub trait QueryerContext: Send {
    async fn query_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>>;
}

/// Liveness check.
#[async_trait]
pub trait Pinger: Send {
    async fn ping(&mut self, ctx: &Context) -> Result<()>;
}

/// Prepares a connection for reuse by a new caller.
#[async_trait]
pub trait SessionResetter: Send {
    async fn reset_session(&mut self, ctx: &Context) -> Result<()>;
}

pub trait Validator {
    fn is_valid(&self) -> bool;
}

/// Validates or rewrites a parameter before it is bound. Returning
/// [`crate::Error::Skip`] defers to the default conversion.
pub trait NamedValueChecker {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<()>;
}

/// A prepared statement.
#[async_trait]
pub trait Stmt: Send {
    async fn close(&mut self) -> Result<()>;

    /// Number of placeholders, or `None` when the driver cannot tell.
    fn num_input(&self) -> Option<usize>;

    async fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>>;

    async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>>;

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        None
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        None
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        None
    }

    fn as_column_converter(&self) -> Option<&dyn ColumnConverter> {
        None
    }
}

#[async_trait]
pub trait StmtExecContext: Send {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>>;
}

#[async_trait]
pub trait StmtQueryContext: Send {
    async fn query_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>>;
}

/// Per-column parameter conversion supplied by a statement.
pub trait ColumnConverter {
    fn column_converter(&self, index: usize) -> &dyn ValueConverter;
}

/// Outcome of a data-manipulating statement.
pub trait ExecResult: Send {
    fn last_insert_id(&self) -> Result<i64>;

    fn rows_affected(&self) -> Result<u64>;
}

/// A result-set cursor.
#[async_trait]
pub trait Rows: Send {
    fn columns(&self) -> &[String];

    async fn close(&mut self) -> Result<()>;

    /// Scan the next row into `dest`, which holds one slot per column.
    async fn next(&mut self, dest: &mut [Value]) -> Result<StepResult>;

    fn as_next_result_set(&mut self) -> Option<&mut dyn RowsNextResultSet> {
        None
    }

    fn as_scan_type(&self) -> Option<&dyn ColumnTypeScanType> {
        None
    }

    fn as_database_type_name(&self) -> Option<&dyn ColumnTypeDatabaseTypeName> {
        None
    }

    fn as_length(&self) -> Option<&dyn ColumnTypeLength> {
        None
    }

    fn as_nullable(&self) -> Option<&dyn ColumnTypeNullable> {
        None
    }

    fn as_precision_scale(&self) -> Option<&dyn ColumnTypePrecisionScale> {
        None
    }
}

#[async_trait]
pub trait RowsNextResultSet: Send {
    fn has_next_result_set(&mut self) -> bool;

    /// Advance to the next result set, failing with
    /// [`crate::Error::NoMoreResultSets`] when there is none.
    async fn next_result_set(&mut self) -> Result<()>;
}

pub trait ColumnTypeScanType {
    fn column_type_scan_type(&self, index: usize) -> ScanType;
}

pub trait ColumnTypeDatabaseTypeName {
    fn column_type_database_type_name(&self, index: usize) -> String;
}

pub trait ColumnTypeLength {
    /// Length of variable-length columns, `None` when not applicable.
    fn column_type_length(&self, index: usize) -> Option<u64>;
}

pub trait ColumnTypeNullable {
    /// Whether the column may be null, `None` when unknown.
    fn column_type_nullable(&self, index: usize) -> Option<bool>;
}

pub trait ColumnTypePrecisionScale {
    /// Precision and scale of decimal columns, `None` when not applicable.
    fn column_type_precision_scale(&self, index: usize) -> Option<(u64, u64)>;
}

/// An open transaction.
#[async_trait]
pub trait Tx: Send {
    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
