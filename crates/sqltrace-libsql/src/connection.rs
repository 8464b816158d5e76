//! libsql connection, transaction and exec result.

use std::sync::Arc;

use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Database, TransactionBehavior};
use sqltrace_driver::{
    Conn, ConnBeginTx, ConnPrepareContext, Context, Error, ExecResult, Execer, ExecerContext,
    IsolationLevel, NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Result, Rows,
    SessionResetter, Stmt, Tx, TxOptions, Validator, Value,
};
use tracing::debug;

use crate::rows::LibsqlRows;
use crate::statement::LibsqlStmt;
use crate::value::{named, positional};

/// A single libsql connection.
///
/// Closing drops the underlying connection; every later call fails with
/// `Error::BadConnection`.
pub struct LibsqlConn {
    // Keep the Database alive for as long as the connection is.
    _database: Arc<Database>,
    conn: Option<libsql::Connection>,
}

impl LibsqlConn {
    pub(crate) fn new(database: Arc<Database>, conn: libsql::Connection) -> Self {
        Self {
            _database: database,
            conn: Some(conn),
        }
    }

    fn conn(&self) -> Result<&libsql::Connection> {
        self.conn.as_ref().ok_or(Error::BadConnection)
    }

    async fn prepare_statement(&self, query: &str) -> Result<Box<dyn Stmt>> {
        let conn = self.conn()?;
        let stmt = conn.prepare(query).await.map_err(Error::driver)?;
        Ok(Box::new(LibsqlStmt::new(conn.clone(), stmt)))
    }

    async fn begin_with(&self, behavior: TransactionBehavior) -> Result<Box<dyn Tx>> {
        let tx = self
            .conn()?
            .transaction_with_behavior(behavior)
            .await
            .map_err(Error::driver)?;
        Ok(Box::new(LibsqlTx { tx: Some(tx) }))
    }
}

async fn execute(conn: &libsql::Connection, query: &str, params: Params) -> Result<Box<dyn ExecResult>> {
    let affected = conn.execute(query, params).await.map_err(Error::driver)?;
    Ok(Box::new(LibsqlResult {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected: affected,
    }))
}

async fn query_rows(conn: &libsql::Connection, query: &str, params: Params) -> Result<Box<dyn Rows>> {
    let rows = conn.query(query, params).await.map_err(Error::driver)?;
    Ok(Box::new(LibsqlRows::new(rows, None)))
}

/// SQLite transactions are always serializable, so only the default and
/// serializable levels can be honored. Serializable takes the write lock
/// up front.
fn behavior_for(opts: TxOptions) -> Result<TransactionBehavior> {
    if opts.read_only {
        return Err(Error::Unsupported {
            capability: "read-only transactions",
        });
    }
    match opts.isolation {
        IsolationLevel::Default => Ok(TransactionBehavior::Deferred),
        IsolationLevel::Serializable => Ok(TransactionBehavior::Immediate),
        _ => Err(Error::Unsupported {
            capability: "isolation level",
        }),
    }
}

#[async_trait]
impl Conn for LibsqlConn {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
        self.prepare_statement(query).await
    }

    async fn close(&mut self) -> Result<()> {
        if self.conn.take().is_some() {
            debug!("libsql connection closed");
        }
        Ok(())
    }

    async fn begin(&mut self) -> Result<Box<dyn Tx>> {
        self.begin_with(TransactionBehavior::Deferred).await
    }

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        Some(self)
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        Some(self)
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        Some(self)
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        Some(self)
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        Some(self)
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        Some(self)
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        Some(self)
    }

    fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
        Some(self)
    }

    fn as_validator(&self) -> Option<&dyn Validator> {
        Some(self)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        Some(self)
    }
}

#[async_trait]
impl ConnBeginTx for LibsqlConn {
    async fn begin_tx(&mut self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        let behavior = behavior_for(opts)?;
        ctx.run(self.begin_with(behavior)).await
    }
}

#[async_trait]
impl ConnPrepareContext for LibsqlConn {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        ctx.run(self.prepare_statement(query)).await
    }
}

#[async_trait]
impl Execer for LibsqlConn {
    async fn exec(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        execute(self.conn()?, query, positional(args)).await
    }
}

#[async_trait]
impl ExecerContext for LibsqlConn {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        ctx.run(execute(self.conn()?, query, named(args))).await
    }
}

#[async_trait]
impl Queryer for LibsqlConn {
    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        query_rows(self.conn()?, query, positional(args)).await
    }
}

#[async_trait]
impl QueryerContext for LibsqlConn {
    async fn query_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        ctx.run(query_rows(self.conn()?, query, named(args))).await
    }
}

#[async_trait]
impl Pinger for LibsqlConn {
    async fn ping(&mut self, ctx: &Context) -> Result<()> {
        let conn = self.conn()?;
        ctx.run(async {
            conn.query("SELECT 1", ()).await.map_err(Error::driver)?;
            Ok(())
        })
        .await
    }
}

/// A connection left inside an open transaction cannot be handed to a new
/// caller.
#[async_trait]
impl SessionResetter for LibsqlConn {
    async fn reset_session(&mut self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        if !self.conn()?.is_autocommit() {
            debug!("libsql connection still inside a transaction, refusing reuse");
            return Err(Error::BadConnection);
        }
        Ok(())
    }
}

impl Validator for LibsqlConn {
    fn is_valid(&self) -> bool {
        self.conn.is_some()
    }
}

impl NamedValueChecker for LibsqlConn {
    fn check_named_value(&self, _value: &mut NamedValue) -> Result<()> {
        Ok(())
    }
}

pub struct LibsqlTx {
    tx: Option<libsql::Transaction>,
}

impl LibsqlTx {
    fn take(&mut self) -> Result<libsql::Transaction> {
        self.tx
            .take()
            .ok_or_else(|| Error::driver("transaction is no longer active"))
    }
}

#[async_trait]
impl Tx for LibsqlTx {
    async fn commit(&mut self) -> Result<()> {
        self.take()?.commit().await.map_err(Error::driver)
    }

    async fn rollback(&mut self) -> Result<()> {
        self.take()?.rollback().await.map_err(Error::driver)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LibsqlResult {
    pub(crate) last_insert_id: i64,
    pub(crate) rows_affected: u64,
}

impl ExecResult for LibsqlResult {
    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_id)
    }

    fn rows_affected(&self) -> Result<u64> {
        Ok(self.rows_affected)
    }
}
