//! Observer contract.
//!
//! Every intercepted operation ends with exactly one call on the configured
//! [`Observer`], made after the driver call returned and after its duration
//! was measured. Observers run on the caller's task and should not block.

use std::time::Duration;

use sqltrace_driver::{Context, Error, NamedValue, StepResult, Value};

/// Receives one report per intercepted driver operation.
///
/// `err` is always the raw driver error. For exec/query events `replaced` is
/// the value the error replacer substituted, which is what the caller got
/// back instead of `err`. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait Observer: Send + Sync {
    fn connect(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn conn_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn tx_begin(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn tx_commit(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn tx_rollback(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
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
    }

    fn named_value_check(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn validate_conn(&self, ctx: &Context, is_valid: bool, elapsed: Duration) {}

    fn ping(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn reset_session(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    fn rows_close(&self, ctx: &Context, err: Option<&Error>, elapsed: Duration) {}

    /// `dest` holds the slots as they are after the scan. Reaching the end
    /// of the result set is reported as `Ok(StepResult::Done)`.
    fn rows_next(
        &self,
        ctx: &Context,
        dest: &[Value],
        outcome: Result<StepResult, &Error>,
        elapsed: Duration,
    ) {
    }

    fn stmt_prepare(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {}

    fn stmt_close(&self, ctx: &Context, query: &str, err: Option<&Error>, elapsed: Duration) {}

    fn stmt_exec(
        &self,
        ctx: &Context,
        query: &str,
        args: &[NamedValue],
        replaced: Option<&Error>,
        err: Option<&Error>,
        elapsed: Duration,
    ) {
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
    }
}

/// Observer that discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}
