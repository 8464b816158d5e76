//! Instrumented connection.

use std::time::Instant;

use async_trait::async_trait;
use sqltrace_driver::{
    Conn, ConnBeginTx, ConnPrepareContext, Context, Error, ExecResult, Execer, ExecerContext,
    NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Result, Rows,
    SessionResetter, Stmt, Tx, TxOptions, Validator, Value, named_to_values, values_to_named,
};
use tracing::{trace, warn};

use crate::config::Settings;
use crate::replacer::settle;
use crate::result::TracedResult;
use crate::rows::TracedRows;
use crate::statement::TracedStmt;
use crate::transaction::TracedTx;

/// Connection whose operations are timed and reported to the observer.
///
/// The context the connection was opened with is its default context: the
/// baseline calls (`prepare`, `begin`, `exec`, `query`, `close`) and the
/// fallbacks taken when the driver lacks a context-aware extension report
/// under it, and the statements and transactions they open inherit it.
pub struct TracedConn {
    settings: Settings,
    ctx: Context,
    conn: Box<dyn Conn>,
}

impl TracedConn {
    pub(crate) fn new(settings: Settings, ctx: Context, conn: Box<dyn Conn>) -> Self {
        Self {
            settings,
            ctx,
            conn,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub async fn prepare(&mut self, query: &str) -> Result<TracedStmt> {
        let started = Instant::now();
        let outcome = self.conn.prepare(query).await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .stmt_prepare(&self.ctx, query, outcome.as_ref().err(), elapsed);
        let stmt = outcome?;
        Ok(TracedStmt::new(
            self.settings.clone(),
            self.ctx.clone(),
            query,
            stmt,
        ))
    }

    pub async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<TracedStmt> {
        let Some(preparer) = self.conn.as_prepare_context() else {
            trace!(query, "connection lacks context-aware prepare, using baseline");
            return self.prepare(query).await;
        };

        let started = Instant::now();
        let outcome = preparer.prepare_context(ctx, query).await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .stmt_prepare(ctx, query, outcome.as_ref().err(), elapsed);
        let stmt = outcome?;
        Ok(TracedStmt::new(self.settings.clone(), ctx.clone(), query, stmt))
    }

    pub async fn close(&mut self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.conn.close().await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .conn_close(&self.ctx, outcome.as_ref().err(), elapsed);
        outcome
    }

    pub async fn begin(&mut self) -> Result<TracedTx> {
        let started = Instant::now();
        let outcome = self.conn.begin().await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .tx_begin(&self.ctx, outcome.as_ref().err(), elapsed);
        let tx = outcome?;
        Ok(TracedTx::new(
            self.settings.observer.clone(),
            self.ctx.clone(),
            tx,
        ))
    }

    /// Begin with options. Without the begin-tx extension the options
    /// cannot be applied and a plain `begin` is issued.
    pub async fn begin_tx(&mut self, ctx: &Context, opts: TxOptions) -> Result<TracedTx> {
        let Some(beginner) = self.conn.as_begin_tx() else {
            if !opts.is_default() {
                warn!(?opts, "connection lacks begin-tx support, transaction options dropped");
            }
            return self.begin().await;
        };

        let started = Instant::now();
        let outcome = beginner.begin_tx(ctx, opts).await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .tx_begin(ctx, outcome.as_ref().err(), elapsed);
        let tx = outcome?;
        Ok(TracedTx::new(self.settings.observer.clone(), ctx.clone(), tx))
    }

    /// Direct exec. Fails with `Error::Skip` when the driver only executes
    /// through prepared statements.
    pub async fn exec(&mut self, query: &str, args: &[Value]) -> Result<TracedResult> {
        let Some(execer) = self.conn.as_execer() else {
            return Err(Error::Skip { operation: "exec" });
        };

        let started = Instant::now();
        let outcome = execer.exec(query, args).await;
        let elapsed = started.elapsed();

        let named = values_to_named(args);
        let result = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .exec(&self.ctx, query, &named, replaced, err, elapsed);
        })?;
        Ok(TracedResult::new(result))
    }

    pub async fn exec_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<TracedResult> {
        let Some(execer) = self.conn.as_execer_context() else {
            trace!(query, "connection lacks context-aware exec, using baseline");
            return self.exec(query, &named_to_values(args)).await;
        };

        let started = Instant::now();
        let outcome = execer.exec_context(ctx, query, args).await;
        let elapsed = started.elapsed();

        let result = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .exec(ctx, query, args, replaced, err, elapsed);
        })?;
        Ok(TracedResult::new(result))
    }

    /// Direct query. Fails with `Error::Skip` when the driver only queries
    /// through prepared statements.
    pub async fn query(&mut self, query: &str, args: &[Value]) -> Result<TracedRows> {
        let Some(queryer) = self.conn.as_queryer() else {
            return Err(Error::Skip { operation: "query" });
        };

        let started = Instant::now();
        let outcome = queryer.query(query, args).await;
        let elapsed = started.elapsed();

        let named = values_to_named(args);
        let rows = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .query(&self.ctx, query, &named, replaced, err, elapsed);
        })?;
        Ok(TracedRows::new(
            self.settings.observer.clone(),
            self.ctx.clone(),
            rows,
        ))
    }

    pub async fn query_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<TracedRows> {
        let Some(queryer) = self.conn.as_queryer_context() else {
            trace!(query, "connection lacks context-aware query, using baseline");
            return self.query(query, &named_to_values(args)).await;
        };

        let started = Instant::now();
        let outcome = queryer.query_context(ctx, query, args).await;
        let elapsed = started.elapsed();

        let rows = settle(&self.settings.replacer, outcome, |replaced, err| {
            self.settings
                .observer
                .query(ctx, query, args, replaced, err, elapsed);
        })?;
        Ok(TracedRows::new(
            self.settings.observer.clone(),
            ctx.clone(),
            rows,
        ))
    }

    pub async fn ping(&mut self, ctx: &Context) -> Result<()> {
        let Some(pinger) = self.conn.as_pinger() else {
            return Err(Error::Unsupported { capability: "ping" });
        };

        let started = Instant::now();
        let outcome = pinger.ping(ctx).await;
        let elapsed = started.elapsed();

        self.settings
            .observer
            .ping(ctx, outcome.as_ref().err(), elapsed);
        outcome
    }

    pub async fn reset_session(&mut self, ctx: &Context) -> Result<()> {
        match self.conn.as_session_resetter() {
            Some(resetter) => resetter.reset_session(ctx).await,
            None => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.conn
            .as_validator()
            .is_none_or(|validator| validator.is_valid())
    }

    /// Forward to the driver's checker; `Error::Skip` means "use the default
    /// conversion".
    pub fn check_named_value(&self, value: &mut NamedValue) -> Result<()> {
        match self.conn.as_named_value_checker() {
            Some(checker) => checker.check_named_value(value),
            None => Err(Error::Skip {
                operation: "named value check",
            }),
        }
    }
}

#[async_trait]
impl Conn for TracedConn {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
        let stmt = TracedConn::prepare(self, query).await?;
        Ok(Box::new(stmt))
    }

    async fn close(&mut self) -> Result<()> {
        TracedConn::close(self).await
    }

    async fn begin(&mut self) -> Result<Box<dyn Tx>> {
        let tx = TracedConn::begin(self).await?;
        Ok(Box::new(tx))
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
impl ConnBeginTx for TracedConn {
    async fn begin_tx(&mut self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        let tx = TracedConn::begin_tx(self, ctx, opts).await?;
        Ok(Box::new(tx))
    }
}

#[async_trait]
impl ConnPrepareContext for TracedConn {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        let stmt = TracedConn::prepare_context(self, ctx, query).await?;
        Ok(Box::new(stmt))
    }
}

#[async_trait]
impl Execer for TracedConn {
    async fn exec(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn ExecResult>> {
        let result = TracedConn::exec(self, query, args).await?;
        Ok(Box::new(result))
    }
}

#[async_trait]
impl ExecerContext for TracedConn {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        let result = TracedConn::exec_context(self, ctx, query, args).await?;
        Ok(Box::new(result))
    }
}

#[async_trait]
impl Queryer for TracedConn {
    async fn query(&mut self, query: &str, args: &[Value]) -> Result<Box<dyn Rows>> {
        let rows = TracedConn::query(self, query, args).await?;
        Ok(Box::new(rows))
    }
}

#[async_trait]
impl QueryerContext for TracedConn {
    async fn query_context(
        &mut self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        let rows = TracedConn::query_context(self, ctx, query, args).await?;
        Ok(Box::new(rows))
    }
}

#[async_trait]
impl Pinger for TracedConn {
    async fn ping(&mut self, ctx: &Context) -> Result<()> {
        TracedConn::ping(self, ctx).await
    }
}

#[async_trait]
impl SessionResetter for TracedConn {
    async fn reset_session(&mut self, ctx: &Context) -> Result<()> {
        TracedConn::reset_session(self, ctx).await
    }
}

impl Validator for TracedConn {
    fn is_valid(&self) -> bool {
        TracedConn::is_valid(self)
    }
}

impl NamedValueChecker for TracedConn {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<()> {
        TracedConn::check_named_value(self, value)
    }
}

impl std::fmt::Debug for TracedConn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedConn")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
