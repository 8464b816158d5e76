use async_trait::async_trait;
use libsql::params::Params;
use sqltrace_driver::{
    Context, Error, ExecResult, NamedValue, Result, Rows, Stmt, StmtExecContext,
    StmtQueryContext, Value,
};

use crate::connection::LibsqlResult;
use crate::rows::LibsqlRows;
use crate::value::{named, positional};

/// Prepared libsql statement.
pub struct LibsqlStmt {
    conn: libsql::Connection,
    stmt: Option<libsql::Statement>,
}

impl LibsqlStmt {
    pub(crate) fn new(conn: libsql::Connection, stmt: libsql::Statement) -> Self {
        Self {
            conn,
            stmt: Some(stmt),
        }
    }

    fn statement(&mut self) -> Result<&mut libsql::Statement> {
        self.stmt
            .as_mut()
            .ok_or_else(|| Error::driver("statement is closed"))
    }

    async fn run_exec(&mut self, params: Params) -> Result<Box<dyn ExecResult>> {
        let stmt = self.statement()?;
        stmt.reset();
        let affected = stmt.execute(params).await.map_err(Error::driver)?;
        Ok(Box::new(LibsqlResult {
            last_insert_id: self.conn.last_insert_rowid(),
            rows_affected: affected as u64,
        }))
    }

    async fn run_query(&mut self, params: Params) -> Result<Box<dyn Rows>> {
        let stmt = self.statement()?;
        stmt.reset();
        let decl_types: Vec<String> = stmt
            .columns()
            .iter()
            .map(|column| column.decl_type().unwrap_or_default().to_string())
            .collect();
        let rows = stmt.query(params).await.map_err(Error::driver)?;
        Ok(Box::new(LibsqlRows::new(rows, Some(decl_types))))
    }
}

#[async_trait]
impl Stmt for LibsqlStmt {
    async fn close(&mut self) -> Result<()> {
        self.stmt = None;
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        self.stmt.as_ref().map(libsql::Statement::parameter_count)
    }

    async fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.run_exec(positional(args)).await
    }

    async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
        self.run_query(positional(args)).await
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        Some(self)
    }
}

#[async_trait]
impl StmtExecContext for LibsqlStmt {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        ctx.run(self.run_exec(named(args))).await
    }
}

#[async_trait]
impl StmtQueryContext for LibsqlStmt {
    async fn query_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        ctx.run(self.run_query(named(args))).await
    }
}
