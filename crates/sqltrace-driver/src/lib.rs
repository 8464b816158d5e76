//! # sqltrace-driver
//!
//! Driver contract consumed by the `sqltrace` decorator.
//!
//! A driver supplies five kinds of primitives (connection, prepared
//! statement, result-set cursor, transaction, exec result). Each trait holds
//! the baseline operations only; everything else is an optional capability
//! reached through an `as_*` probe that returns `None` unless the driver
//! opts in.

pub mod context;
pub mod driver;
pub mod value;

pub use context::{CancelHandle, Context};
pub use driver::{
    ColumnConverter, ColumnTypeDatabaseTypeName, ColumnTypeLength, ColumnTypeNullable,
    ColumnTypePrecisionScale, ColumnTypeScanType, Conn, ConnBeginTx, ConnPrepareContext,
    Connector, Driver, ExecResult, Execer, ExecerContext, NamedValueChecker, Pinger, Queryer,
    QueryerContext, Rows, RowsNextResultSet, SessionResetter, Stmt, StmtExecContext,
    StmtQueryContext, Tx, Validator,
};
pub use value::{
    DefaultConverter, IsolationLevel, NamedValue, ScanType, StepResult, TxOptions, Value,
    ValueConverter, named_to_values, values_to_named,
};

use thiserror::Error;

/// Boxed error produced by a driver or supplied by an error replacer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors shared by drivers and the decorator.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: observer is not configured")]
    MissingObserver,

    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("{capability} is unsupported by the underlying driver")]
    Unsupported { capability: &'static str },

    /// The driver does not implement the baseline operation at all. Callers
    /// should take the prepare-then-execute path instead.
    #[error("driver skipped {operation}")]
    Skip { operation: &'static str },

    #[error("no more result sets")]
    NoMoreResultSets,

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("connection is closed or no longer usable")]
    BadConnection,

    #[error("Driver error: {0}")]
    Driver(#[source] BoxError),

    #[error("{0}")]
    Replaced(#[source] BoxError),
}

impl Error {
    /// Wrap any driver-level failure.
    pub fn driver(err: impl Into<BoxError>) -> Self {
        Self::Driver(err.into())
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced(_))
    }

    /// Downcast the raw driver error, if this is one.
    pub fn driver_error<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Driver(source) => source.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Downcast the replacement installed by an error replacer, if this is one.
    pub fn replaced<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Replaced(source) => source.downcast_ref::<T>(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
