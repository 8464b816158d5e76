//! Exec result pass-through.

use sqltrace_driver::{ExecResult, Result};

/// Outcome of an instrumented exec. The exec itself was already reported;
/// the accessors are forwarded as is.
pub struct TracedResult {
    result: Box<dyn ExecResult>,
}

impl TracedResult {
    pub(crate) fn new(result: Box<dyn ExecResult>) -> Self {
        Self { result }
    }

    pub fn last_insert_id(&self) -> Result<i64> {
        self.result.last_insert_id()
    }

    pub fn rows_affected(&self) -> Result<u64> {
        self.result.rows_affected()
    }
}

impl ExecResult for TracedResult {
    fn last_insert_id(&self) -> Result<i64> {
        TracedResult::last_insert_id(self)
    }

    fn rows_affected(&self) -> Result<u64> {
        TracedResult::rows_affected(self)
    }
}

impl std::fmt::Debug for TracedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedResult").finish_non_exhaustive()
    }
}
