//! Observer that forwards every report to `tracing`.
//!
//! Levels: successful operations at `debug`, failures the replacer mapped
//! onto an application error at `debug`, other failures at `error`, end of
//! a result set at `trace`, and successful operations slower than the
//! configured threshold at `warn`.
//!
//! ```ignore
//! let observer = TracingObserver::new()
//!     .with_parameter_logging(true)
//!     .with_slow_threshold(Duration::from_millis(100));
//! ```

use std::time::Duration;

use sqltrace_driver::{Context, Error, NamedValue, StepResult, Value};
use tracing::Level;

use crate::observer::Observer;

macro_rules! emit {
    ($level:expr, $($rest:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::event!(Level::ERROR, $($rest)+);
        } else if level == Level::WARN {
            tracing::event!(Level::WARN, $($rest)+);
        } else if level == Level::INFO {
            tracing::event!(Level::INFO, $($rest)+);
        } else if level == Level::DEBUG {
            tracing::event!(Level::DEBUG, $($rest)+);
        } else {
            tracing::event!(Level::TRACE, $($rest)+);
        }
    }};
}

#[derive(Debug, Clone)]
pub struct TracingObserver {
    log_statements: bool,
    log_parameters: bool,
    slow_threshold: Option<Duration>,
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self {
            log_statements: true,
            log_parameters: false,
            slow_threshold: None,
        }
    }
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include the SQL text in statement events (default: on).
    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Include bound parameters, rendered as JSON (default: off).
    pub fn with_parameter_logging(mut self, enabled: bool) -> Self {
        self.log_parameters = enabled;
        self
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    fn level(&self, err: Option<&Error>, replaced: Option<&Error>, elapsed: Duration) -> Level {
        match (err, replaced) {
            (Some(_), Some(_)) => Level::DEBUG,
            (Some(_), None) => Level::ERROR,
            (None, _) if self.is_slow(elapsed) => Level::WARN,
            (None, _) => Level::DEBUG,
        }
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        self.slow_threshold.is_some_and(|threshold| elapsed >= threshold)
    }

    fn simple(&self, event: &'static str, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        emit!(
            self.level(err, None, elapsed),
            event,
            elapsed_ms = millis(elapsed),
            labels = %render_labels(ctx),
            error = %render_error(err),
            "sql {}",
            event
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn statement(
        &self,
        event: &'static str,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        let statement = if self.log_statements { query } else { "" };
        let params = if self.log_parameters {
            serde_json::to_string(args).unwrap_or_default()
        } else {
            String::new()
        };

        emit!(
            self.level(err, replaced, elapsed),
            event,
            elapsed_ms = millis(elapsed),
            labels = %render_labels(ctx),
            statement,
            params = %params,
            error = %render_error(err),
            replaced = %render_error(replaced),
            "sql {}",
            event
        );
    }

    fn prepared(
        &self,
        event: &'static str,
        ctx: &Context,
        query: &str,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
        let statement = if self.log_statements { query } else { "" };
        emit!(
            self.level(err, None, elapsed),
            event,
            elapsed_ms = millis(elapsed),
            labels = %render_labels(ctx),
            statement,
            error = %render_error(err),
            "sql {}",
            event
        );
    }
}

impl Observer for TracingObserver {
    fn connect(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("connect", ctx, err, elapsed);
    }

    fn conn_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("conn_close", ctx, err, elapsed);
    }

    fn tx_begin(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("tx_begin", ctx, err, elapsed);
    }

    fn tx_commit(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("tx_commit", ctx, err, elapsed);
    }

    fn tx_rollback(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("tx_rollback", ctx, err, elapsed);
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
        self.statement("exec", ctx, query, args, replaced, err, elapsed);
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
        self.statement("query", ctx, query, args, replaced, err, elapsed);
    }

    fn named_value_check(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("named_value_check", ctx, err, elapsed);
    }

    fn validate_conn(&self, ctx: &Context, is_valid: bool, elapsed: Duration) {
        let level = if is_valid { Level::DEBUG } else { Level::WARN };
        emit!(
            level,
            event = "validate_conn",
            is_valid,
            elapsed_ms = millis(elapsed),
            labels = %render_labels(ctx),
            "sql validate_conn"
        );
    }

    fn ping(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("ping", ctx, err, elapsed);
    }

    fn reset_session(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("reset_session", ctx, err, elapsed);
    }

    fn rows_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {
        self.simple("rows_close", ctx, err, elapsed);
    }

    fn rows_next(
        &self,
        ctx: &Context,
        dest: &[Value],
        outcome: Result<StepResult, &Error>,
        elapsed: Duration,
    ) {
        match outcome {
            Ok(StepResult::Done) => tracing::trace!(
                event = "rows_next",
                elapsed_ms = millis(elapsed),
                labels = %render_labels(ctx),
                "sql rows_next: end of rows"
            ),
            Ok(StepResult::Row) => {
                let row = if self.log_parameters {
                    serde_json::to_string(dest).unwrap_or_default()
                } else {
                    String::new()
                };
                emit!(
                    self.level(None, None, elapsed),
                    event = "rows_next",
                    elapsed_ms = millis(elapsed),
                    labels = %render_labels(ctx),
                    row = %row,
                    "sql rows_next"
                );
            }
            Err(err) => self.simple("rows_next", ctx, Some(err), elapsed),
        }
    }

    fn stmt_prepare(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {
        self.prepared("stmt_prepare", ctx, query, err, elapsed);
    }

    fn stmt_close(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {
        self.prepared("stmt_close", ctx, query, err, elapsed);
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
        self.statement("stmt_exec", ctx, query, args, replaced, err, elapsed);
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
        self.statement("stmt_query", ctx, query, args, replaced, err, elapsed);
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

fn render_error(err: Option<&Error>) -> String {
    err.map(ToString::to_string).unwrap_or_default()
}

/// `key=value` pairs joined by commas, in key order.
fn render_labels(ctx: &Context) -> String {
    ctx.labels()
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}
