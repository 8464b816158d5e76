//! Instrumented prepared statement.

use std::time::Instant;

use async_trait::async_trait;
use sqltrace_driver::{
    ColumnConverter, Context, DefaultConverter, Error, ExecResult, NamedValue,
    NamedValueChecker, Result, Rows, Stmt, StmtExecContext, StmtQueryContext, Value,
    ValueConverter, named_to_values, values_to_named,
};
use tracing::trace;

use crate::config::Settings;
use crate::replacer::settle;
use crate::result::TracedResult;
use crate::rows::TracedRows;

/// Prepared statement whose close, exec and query are timed and reported
/// together with the SQL text it was prepared from.
///
/// Calls without a context (and context-aware calls the driver's statement
/// cannot honor) are reported under the context the statement was prepared
/// with.
pub struct TracedStmt {
    settings: Settings,
    ctx: Context,
    query: String,
    stmt: Box<dyn Stmt>,
}

impl TracedStmt {
    pub(crate) fn new(settings: Settings, ctx: Context, query: &str, stmt: Box<dyn Stmt>) -> Self {
        Self {
            settings,
            ctx,
            query: query.to_string(),
            stmt,
        }
    }

    pub fn query_text(&self) -> &str {
        &self.query
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub async fn close(&mut self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.stmt.close().await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .stmt_close(&self.ctx, &self.query, outcome.as_ref().err(), elapsed);
        outcome
    }

    pub fn num_input(&self) -> Option<usize> {
        self.stmt.num_input()
    }

    pub async fn exec(&mut self, args: &[Value]) -> Result<TracedResult> {
        let started = Instant::now();
        let outcome = self.stmt.exec(args).await;
        let elapsed = started.elapsed();

        let named = values_to_named(args);
        let result = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .stmt_exec(&self.ctx, &self.query, &named, replaced, err, elapsed);
        })?;
        Ok(TracedResult::new(result))
    }

    pub async fn exec_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<TracedResult> {
        let Some(execer) = self.stmt.as_exec_context() else {
            trace!(query = %self.query, "statement lacks context-aware exec, using baseline");
            return self.exec(&named_to_values(args)).await;
        };

        let started = Instant::now();
        let outcome = execer.exec_context(ctx, args).await;
        let elapsed = started.elapsed();

        let result = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .stmt_exec(ctx, &self.query, args, replaced, err, elapsed);
        })?;
        Ok(TracedResult::new(result))
    }

    pub async fn query(&mut self, args: &[Value]) -> Result<TracedRows> {
        let started = Instant::now();
        let outcome = self.stmt.query(args).await;
        let elapsed = started.elapsed();

        let named = values_to_named(args);
        let rows = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .stmt_query(&self.ctx, &self.query, &named, replaced, err, elapsed);
        })?;
        Ok(TracedRows::new(
            self.settings.observer.clone(),
            self.ctx.clone(),
            rows,
        ))
    }

    pub async fn query_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<TracedRows> {
        let Some(queryer) = self.stmt.as_query_context() else {
            trace!(query = %self.query, "statement lacks context-aware query, using baseline");
            return self.query(&named_to_values(args)).await;
        };

        let started = Instant::now();
        let outcome = queryer.query_context(ctx, args).await;
        let elapsed = started.elapsed();

        let rows = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .stmt_query(ctx, &self.query, args, replaced, err, elapsed);
        })?;
        Ok(TracedRows::new(
            self.settings.observer.clone(),
            ctx.clone(),
            rows,
        ))
    }

    /// Forward to the statement's checker; `Error::Skip` means "use the
    /// default conversion".
    pub fn check_named_value(&self, value: &mut NamedValue) -> Result<()> {
        match self.stmt.as_named_value_checker() {
            Some(checker) => checker.check_named_value(value),
            None => Err(Error::Skip {
                operation: "named value check",
            }),
        }
    }

    pub fn column_converter(&self, index: usize) -> &dyn ValueConverter {
        match self.stmt.as_column_converter() {
            Some(converter) => converter.column_converter(index),
            None => &DefaultConverter,
        }
    }
}

#[async_trait]
impl Stmt for TracedStmt {
    async fn close(&mut self) -> Result<()> {
        TracedStmt::close(self).await
    }

    fn num_input(&self) -> Option<usize> {
        TracedStmt::num_input(self)
    }

    async fn exec(&mut self, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        let result = TracedStmt::exec(self, args).await?;
        Ok(Box::new(result))
    }

    async fn query(&mut self, args: &[Value]) -> Result<Box<dyn Rows>> {
        let rows = TracedStmt::query(self, args).await?;
        Ok(Box::new(rows))
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        Some(self)
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        Some(self)
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        Some(self)
    }

    fn as_column_converter(&self) -> Option<&dyn ColumnConverter> {
        Some(self)
    }
}

#[async_trait]
impl StmtExecContext for TracedStmt {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let result = TracedStmt::exec_context(self, ctx, args).await?;
        Ok(Box::new(result))
    }
}

#[async_trait]
impl StmtQueryContext for TracedStmt {
    async fn query_context(
        &mut self,
        ctx: &Context,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        let rows = TracedStmt::query_context(self, ctx, args).await?;
        Ok(Box::new(rows))
    }
}

impl NamedValueChecker for TracedStmt {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<()> {
        TracedStmt::check_named_value(self, value)
    }
}

impl ColumnConverter for TracedStmt {
    fn column_converter(&self, index: usize) -> &dyn ValueConverter {
        TracedStmt::column_converter(self, index)
    }
}

impl std::fmt::Debug for TracedStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedStmt")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
