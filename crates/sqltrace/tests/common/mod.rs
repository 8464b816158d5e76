//! Scripted in-memory driver and a recording observer.
//!
//! SQL text steers the fake: statements containing `DUP` fail with a unique
//! violation, `BOGUS` with a syntax error, and every query yields three
//! rows `1, 2, 3` in a single `n` column. Statements and cursors opened from
//! SQL containing `STICKY` fail to close; cursors from SQL containing
//! `CORRUPT` fail while reading the second row.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqltrace::{Config, Context, Error, Observer, Result, StepResult, TracedConnector, Value};
use sqltrace_driver::{
    ColumnTypeDatabaseTypeName, ColumnTypeLength, ColumnTypeNullable, ColumnTypePrecisionScale,
    ColumnTypeScanType, Conn, ConnBeginTx, ConnPrepareContext, Connector, Driver, ExecResult,
    Execer, ExecerContext, NamedValue, NamedValueChecker, Pinger, Queryer, QueryerContext, Rows,
    RowsNextResultSet, ScanType, SessionResetter, Stmt, StmtExecContext, StmtQueryContext, Tx,
    TxOptions, Validator,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FakeError {
    #[error("UNIQUE constraint failed: {0}")]
    Unique(String),
    #[error("syntax error near {0}")]
    Syntax(String),
    #[error("cannot open {0}")]
    Open(String),
    #[error("cannot prepare {0}")]
    Prepare(String),
    #[error("cannot close {0}")]
    Close(String),
    #[error("cannot read row {0}")]
    Read(i64),
}

/// Optional capabilities the fake advertises.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caps {
    pub begin_tx: bool,
    pub prepare_context: bool,
    pub execer: bool,
    pub execer_context: bool,
    pub queryer: bool,
    pub queryer_context: bool,
    pub pinger: bool,
    pub session_resetter: bool,
    pub validator: bool,
    pub named_value_checker: bool,
    pub stmt_context: bool,
    pub rows_metadata: bool,
    pub rows_multi: bool,
}

impl Caps {
    pub fn all() -> Self {
        Self {
            begin_tx: true,
            prepare_context: true,
            execer: true,
            execer_context: true,
            queryer: true,
            queryer_context: true,
            pinger: true,
            session_resetter: true,
            validator: true,
            named_value_checker: true,
            stmt_context: true,
            rows_metadata: true,
            rows_multi: true,
        }
    }

    /// Baseline only: prepare, close, begin.
    pub fn none() -> Self {
        Self::default()
    }

    /// Legacy direct exec/query without context support.
    pub fn legacy() -> Self {
        Self {
            execer: true,
            queryer: true,
            ..Self::default()
        }
    }
}

/// Driver-side call log. Context-aware calls record the `request_id`
/// label they were handed, e.g. `exec_context[r-1]`.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    fn push_ctx(&self, call: &str, ctx: &Context) {
        let label = ctx.label("request_id").unwrap_or("-");
        self.push(format!("{call}[{label}]"));
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn outcome_for(query: &str) -> Result<()> {
    if query.contains("DUP") {
        return Err(Error::driver(FakeError::Unique("users.name".to_string())));
    }
    if query.contains("BOGUS") {
        return Err(Error::driver(FakeError::Syntax("BOGUS".to_string())));
    }
    Ok(())
}

#[derive(Clone)]
pub struct FakeDriver {
    pub caps: Caps,
    pub calls: Calls,
}

#[async_trait]
impl Driver for FakeDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
        self.calls.push(format!("open:{dsn}"));
        if dsn == "unreachable" {
            return Err(Error::driver(FakeError::Open(dsn.to_string())));
        }
        Ok(Box::new(FakeConn {
            caps: self.caps,
            calls: self.calls.clone(),
            closed: false,
        }))
    }
}

pub struct FakeConnector {
    pub driver: FakeDriver,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        self.driver.calls.push_ctx("connect", ctx);
        self.driver.open("fake").await
    }

    fn driver(&self) -> &dyn Driver {
        &self.driver
    }
}

pub struct FakeConn {
    caps: Caps,
    calls: Calls,
    closed: bool,
}

impl FakeConn {
    fn statement(&self, query: &str) -> Result<Box<dyn Stmt>> {
        if query.contains("UNPREPARABLE") {
            return Err(Error::driver(FakeError::Prepare(query.to_string())));
        }
        Ok(Box::new(FakeStmt {
            caps: self.caps,
            calls: self.calls.clone(),
            query: query.to_string(),
        }))
    }

    fn tx(&self) -> Box<dyn Tx> {
        Box::new(FakeTx {
            calls: self.calls.clone(),
        })
    }

    fn rows(&self, query: &str) -> Box<dyn Rows> {
        Box::new(FakeRows::new(self.caps, query))
    }
}

#[async_trait]
impl Conn for FakeConn {
    async fn prepare(&mut self, query: &str) -> Result<Box<dyn Stmt>> {
        self.calls.push("prepare");
        self.statement(query)
    }

    async fn close(&mut self) -> Result<()> {
        self.calls.push("close");
        self.closed = true;
        Ok(())
    }

    async fn begin(&mut self) -> Result<Box<dyn Tx>> {
        self.calls.push("begin");
        Ok(self.tx())
    }

    fn as_begin_tx(&mut self) -> Option<&mut dyn ConnBeginTx> {
        if self.caps.begin_tx { Some(self) } else { None }
    }

    fn as_prepare_context(&mut self) -> Option<&mut dyn ConnPrepareContext> {
        if self.caps.prepare_context { Some(self) } else { None }
    }

    fn as_execer(&mut self) -> Option<&mut dyn Execer> {
        if self.caps.execer { Some(self) } else { None }
    }

    fn as_execer_context(&mut self) -> Option<&mut dyn ExecerContext> {
        if self.caps.execer_context { Some(self) } else { None }
    }

    fn as_queryer(&mut self) -> Option<&mut dyn Queryer> {
        if self.caps.queryer { Some(self) } else { None }
    }

    fn as_queryer_context(&mut self) -> Option<&mut dyn QueryerContext> {
        if self.caps.queryer_context { Some(self) } else { None }
    }

    fn as_pinger(&mut self) -> Option<&mut dyn Pinger> {
        if self.caps.pinger { Some(self) } else { None }
    }

    fn as_session_resetter(&mut self) -> Option<&mut dyn SessionResetter> {
        if self.caps.session_resetter { Some(self) } else { None }
    }

    fn as_validator(&self) -> Option<&dyn Validator> {
        if self.caps.validator { Some(self) } else { None }
    }

    fn as_named_value_checker(&self) -> Option<&dyn NamedValueChecker> {
        if self.caps.named_value_checker { Some(self) } else { None }
    }
}

#[async_trait]
impl ConnBeginTx for FakeConn {
    async fn begin_tx(&mut self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        self.calls.push_ctx("begin_tx", ctx);
        if opts.read_only {
            return Err(Error::Unsupported {
                capability: "read-only transactions",
            });
        }
        Ok(self.tx())
    }
}

#[async_trait]
impl ConnPrepareContext for FakeConn {
    async fn prepare_context(&mut self, ctx: &Context, query: &str) -> Result<Box<dyn Stmt>> {
        self.calls.push_ctx("prepare_context", ctx);
        self.statement(query)
    }
}

#[async_trait]
impl Execer for FakeConn {
    async fn exec(&mut self, query: &str, _args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.calls.push("exec");
        outcome_for(query)?;
        Ok(Box::new(FakeResult))
    }
}

#[async_trait]
impl ExecerContext for FakeConn {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        query: &str,
        _args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        self.calls.push_ctx("exec_context", ctx);
        ctx.run(async { outcome_for(query) }).await?;
        Ok(Box::new(FakeResult))
    }
}

#[async_trait]
impl Queryer for FakeConn {
    async fn query(&mut self, query: &str, _args: &[Value]) -> Result<Box<dyn Rows>> {
        self.calls.push("query");
        outcome_for(query)?;
        Ok(self.rows(query))
    }
}

#[async_trait]
impl QueryerContext for FakeConn {
    async fn query_context(
        &mut self,
        ctx: &Context,
        query: &str,
        _args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        self.calls.push_ctx("query_context", ctx);
        ctx.run(async { outcome_for(query) }).await?;
        Ok(self.rows(query))
    }
}

#[async_trait]
impl Pinger for FakeConn {
    async fn ping(&mut self, ctx: &Context) -> Result<()> {
        self.calls.push_ctx("ping", ctx);
        if self.closed {
            return Err(Error::BadConnection);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionResetter for FakeConn {
    async fn reset_session(&mut self, ctx: &Context) -> Result<()> {
        self.calls.push_ctx("reset_session", ctx);
        if self.closed {
            return Err(Error::BadConnection);
        }
        Ok(())
    }
}

impl Validator for FakeConn {
    fn is_valid(&self) -> bool {
        !self.closed
    }
}

/// Rejects blobs, defers nulls to the default conversion.
impl NamedValueChecker for FakeConn {
    fn check_named_value(&self, value: &mut NamedValue) -> Result<()> {
        match value.value {
            Value::Blob(_) => Err(Error::driver("blobs are not supported")),
            Value::Null => Err(Error::Skip {
                operation: "named value check",
            }),
            _ => Ok(()),
        }
    }
}

pub struct FakeStmt {
    caps: Caps,
    calls: Calls,
    query: String,
}

#[async_trait]
impl Stmt for FakeStmt {
    async fn close(&mut self) -> Result<()> {
        self.calls.push("stmt_close");
        if self.query.contains("STICKY") {
            return Err(Error::driver(FakeError::Close(self.query.clone())));
        }
        Ok(())
    }

    fn num_input(&self) -> Option<usize> {
        Some(self.query.matches('?').count())
    }

    async fn exec(&mut self, _args: &[Value]) -> Result<Box<dyn ExecResult>> {
        self.calls.push("stmt_exec");
        outcome_for(&self.query)?;
        Ok(Box::new(FakeResult))
    }

    async fn query(&mut self, _args: &[Value]) -> Result<Box<dyn Rows>> {
        self.calls.push("stmt_query");
        outcome_for(&self.query)?;
        Ok(Box::new(FakeRows::new(self.caps, &self.query)))
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn StmtExecContext> {
        if self.caps.stmt_context { Some(self) } else { None }
    }

    fn as_query_context(&mut self) -> Option<&mut dyn StmtQueryContext> {
        if self.caps.stmt_context { Some(self) } else { None }
    }
}

#[async_trait]
impl StmtExecContext for FakeStmt {
    async fn exec_context(
        &mut self,
        ctx: &Context,
        _args: &[NamedValue],
    ) -> Result<Box<dyn ExecResult>> {
        self.calls.push_ctx("stmt_exec_context", ctx);
        outcome_for(&self.query)?;
        Ok(Box::new(FakeResult))
    }
}

#[async_trait]
impl StmtQueryContext for FakeStmt {
    async fn query_context(
        &mut self,
        ctx: &Context,
        _args: &[NamedValue],
    ) -> Result<Box<dyn Rows>> {
        self.calls.push_ctx("stmt_query_context", ctx);
        outcome_for(&self.query)?;
        Ok(Box::new(FakeRows::new(self.caps, &self.query)))
    }
}

pub struct FakeResult;

impl ExecResult for FakeResult {
    fn last_insert_id(&self) -> Result<i64> {
        Ok(42)
    }

    fn rows_affected(&self) -> Result<u64> {
        Ok(1)
    }
}

pub struct FakeRows {
    caps: Caps,
    query: String,
    columns: Vec<String>,
    emitted: i64,
    extra_sets: usize,
}

impl FakeRows {
    const ROWS: i64 = 3;

    fn new(caps: Caps, query: &str) -> Self {
        Self {
            caps,
            query: query.to_string(),
            columns: vec!["n".to_string()],
            emitted: 0,
            extra_sets: 1,
        }
    }
}

#[async_trait]
impl Rows for FakeRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn close(&mut self) -> Result<()> {
        if self.query.contains("STICKY") {
            return Err(Error::driver(FakeError::Close("cursor".to_string())));
        }
        Ok(())
    }

    async fn next(&mut self, dest: &mut [Value]) -> Result<StepResult> {
        if self.emitted == Self::ROWS {
            return Ok(StepResult::Done);
        }
        self.emitted += 1;
        if self.emitted == 2 && self.query.contains("CORRUPT") {
            return Err(Error::driver(FakeError::Read(self.emitted)));
        }
        dest[0] = Value::Integer(self.emitted);
        Ok(StepResult::Row)
    }

    fn as_next_result_set(&mut self) -> Option<&mut dyn RowsNextResultSet> {
        if self.caps.rows_multi { Some(self) } else { None }
    }

    fn as_scan_type(&self) -> Option<&dyn ColumnTypeScanType> {
        if self.caps.rows_metadata { Some(self) } else { None }
    }

    fn as_database_type_name(&self) -> Option<&dyn ColumnTypeDatabaseTypeName> {
        if self.caps.rows_metadata { Some(self) } else { None }
    }

    fn as_length(&self) -> Option<&dyn ColumnTypeLength> {
        if self.caps.rows_metadata { Some(self) } else { None }
    }

    fn as_nullable(&self) -> Option<&dyn ColumnTypeNullable> {
        if self.caps.rows_metadata { Some(self) } else { None }
    }

    fn as_precision_scale(&self) -> Option<&dyn ColumnTypePrecisionScale> {
        if self.caps.rows_metadata { Some(self) } else { None }
    }
}

#[async_trait]
impl RowsNextResultSet for FakeRows {
    fn has_next_result_set(&mut self) -> bool {
        self.extra_sets > 0
    }

    async fn next_result_set(&mut self) -> Result<()> {
        if self.extra_sets == 0 {
            return Err(Error::NoMoreResultSets);
        }
        self.extra_sets -= 1;
        self.emitted = 0;
        Ok(())
    }
}

impl ColumnTypeScanType for FakeRows {
    fn column_type_scan_type(&self, _index: usize) -> ScanType {
        ScanType::Integer
    }
}

impl ColumnTypeDatabaseTypeName for FakeRows {
    fn column_type_database_type_name(&self, _index: usize) -> String {
        "BIGINT".to_string()
    }
}

impl ColumnTypeLength for FakeRows {
    fn column_type_length(&self, _index: usize) -> Option<u64> {
        Some(8)
    }
}

impl ColumnTypeNullable for FakeRows {
    fn column_type_nullable(&self, _index: usize) -> Option<bool> {
        Some(false)
    }
}

impl ColumnTypePrecisionScale for FakeRows {
    fn column_type_precision_scale(&self, _index: usize) -> Option<(u64, u64)> {
        Some((19, 0))
    }
}

pub struct FakeTx {
    calls: Calls,
}

#[async_trait]
impl Tx for FakeTx {
    async fn commit(&mut self) -> Result<()> {
        self.calls.push("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.calls.push("rollback");
        Ok(())
    }
}

/// One observer report.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub name: &'static str,
    pub request_id: Option<String>,
    pub query: Option<String>,
    pub args: Vec<NamedValue>,
    pub err: Option<String>,
    pub replaced: Option<String>,
    pub step: Option<StepResult>,
    pub dest: Vec<Value>,
    pub is_valid: Option<bool>,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|event| event.name == name).count()
    }

    pub fn last(&self) -> Event {
        self.events().pop().unwrap()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn record(&self, name: &'static str, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.push(Event {
            name,
            request_id: request_id(ctx),
            err: err.map(ToString::to_string),
            elapsed,
            ..Event::default()
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn record_statement(
        &self,
        name: &'static str,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        self.push(Event {
            name,
            request_id: request_id(ctx),
            query: Some(query.to_string()),
            args: args.to_vec(),
            err: err.map(ToString::to_string),
            replaced: replaced.map(ToString::to_string),
            elapsed,
            ..Event::default()
        });
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

fn request_id(ctx: &Context) -> Option<String> {
    ctx.label("request_id").map(str::to_string)
}

impl Observer for RecordingObserver {
    fn connect(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("connect", ctx, err, elapsed);
    }

    fn conn_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("conn_close", ctx, err, elapsed);
    }

    fn tx_begin(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("tx_begin", ctx, err, elapsed);
    }

    fn tx_commit(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("tx_commit", ctx, err, elapsed);
    }

    fn tx_rollback(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("tx_rollback", ctx, err, elapsed);
    }

    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        self.record_statement("exec", ctx, query, args, replaced, err, elapsed);
    }

    fn query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        self.record_statement("query", ctx, query, args, replaced, err, elapsed);
    }

    fn named_value_check(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("named_value_check", ctx, err, elapsed);
    }

    fn validate_conn(&self, ctx: &Context, is_valid: bool, elapsed: Duration) {
        self.push(Event {
            name: "validate_conn",
            request_id: request_id(ctx),
            is_valid: Some(is_valid),
            elapsed,
            ..Event::default()
        });
    }

    fn ping(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("ping", ctx, err, elapsed);
    }

    fn reset_session(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("reset_session", ctx, err, elapsed);
    }

    fn rows_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.record("rows_close", ctx, err, elapsed);
    }

    fn rows_next(
        &self,
        ctx: &Context,
        dest: &[Value],
        outcome: std::result::Result<StepResult, &Error>,
        elapsed: Duration,
    ) {
        self.push(Event {
            name: "rows_next",
            request_id: request_id(ctx),
            step: outcome.as_ref().ok().copied(),
            err: outcome.err().map(ToString::to_string),
            dest: dest.to_vec(),
            elapsed,
            ..Event::default()
        });
    }

    fn stmt_prepare(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {
        self.record_statement("stmt_prepare", ctx, query, &[], None, err, elapsed);
    }

    fn stmt_close(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {
        self.record_statement("stmt_close", ctx, query, &[], None, err, elapsed);
    }

    fn stmt_exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        self.record_statement("stmt_exec", ctx, query, args, replaced, err, elapsed);
    }

    fn stmt_query(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        self.record_statement("stmt_query", ctx, query, args, replaced, err, elapsed);
    }
}

/// Domain error installed by [`duplicate_key_replacer`].
#[derive(Debug, thiserror::Error)]
#[error("user already exists")]
pub struct UserExists;

pub fn duplicate_key_config(observer: Arc<RecordingObserver>) -> Config {
    Config::new()
        .with_shared_observer(observer)
        .with_replacer(|err: &Error| -> Option<sqltrace::BoxError> {
            match err.driver_error::<FakeError>() {
                Some(FakeError::Unique(_)) => Some(Box::new(UserExists)),
                _ => None,
            }
        })
}

pub struct Harness {
    pub connector: TracedConnector,
    pub observer: Arc<RecordingObserver>,
    pub calls: Calls,
}

/// Traced connector over a [`FakeConnector`] with the given capabilities
/// and the duplicate-key replacer installed.
pub fn harness(caps: Caps) -> Harness {
    let observer = RecordingObserver::new();
    let calls = Calls::default();
    let connector = TracedConnector::from_connector(
        FakeConnector {
            driver: FakeDriver {
                caps,
                calls: calls.clone(),
            },
        },
        duplicate_key_config(observer.clone()),
    )
    .unwrap();
    Harness {
        connector,
        observer,
        calls,
    }
}

pub fn request(id: &str) -> Context {
    Context::background().with_label("request_id", id)
}
