//! Error substitution for exec/query outcomes.
//!
//! A replacer maps a raw driver error onto an application error, typically
//! to turn a driver-specific failure (a unique-key violation, a missing
//! table) into a domain error the caller can match on:
//!
//! ```ignore
//! #[derive(Debug, thiserror::Error)]
//! #[error("duplicate table")]
//! struct DuplicateTable;
//!
//! let config = Config::new()
//!     .with_observer(TracingObserver::new())
//!     .with_replacer(|err| match err.driver_error::<PgError>() {
//!         Some(pg) if pg.code == "42P07" => Some(Box::new(DuplicateTable)),
//!         _ => None,
//!     });
//! ```
//!
//! The caller then receives `Error::Replaced` and can test it with
//! `err.replaced::<DuplicateTable>()`, while the observer still sees the
//! raw error.

use std::sync::Arc;

use sqltrace_driver::{BoxError, Error, Result};

/// Returns `Some` to substitute the raw error, `None` to keep it.
pub type ErrorReplacer = Arc<dyn Fn(&Error) -> Option<BoxError> + Send + Sync>;

/// Replacer that never substitutes.
pub fn noop_replacer() -> ErrorReplacer {
    Arc::new(|_: &Error| -> Option<BoxError> { None })
}

/// Split an exec/query outcome into the caller-visible result.
///
/// `report` receives `(replaced, raw)` exactly once before the result is
/// returned. Skip signals are neither substituted nor reported: they say
/// the driver lacks the operation, not that it failed.
pub(crate) fn settle<T>(
    replacer: &ErrorReplacer,
    outcome: Result<T>,
    report: impl FnOnce(Option<&Error>, Option<&Error>),
) -> Result<T> {
    match outcome {
        Ok(value) => {
            report(None, None);
            Ok(value)
        }
        Err(raw) if raw.is_skip() => Err(raw),
        Err(raw) => {
            let replaced = replacer(&raw).map(Error::Replaced);
            report(replaced.as_ref(), Some(&raw));
            Err(replaced.unwrap_or(raw))
        }
    }
}
