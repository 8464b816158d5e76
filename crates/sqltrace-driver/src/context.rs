//! Request-scoped context: deadline, cancellation and correlation labels.
//!
//! A `Context` is cheap to clone. Drivers that implement a context-aware
//! capability are expected to honor it, usually by driving their future
//! through [`Context::run`]. Drivers without such a capability never see it.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
    labels: Arc<BTreeMap<String, String>>,
}

impl Context {
    /// Empty context: no deadline, never cancelled, no labels.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let mut ctx = self.clone();
        ctx.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        ctx
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that is cancelled by the returned handle or when
    /// any ancestor is cancelled.
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let token = match &self.cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let mut ctx = self.clone();
        ctx.cancel = Some(token.clone());
        (ctx, CancelHandle { token })
    }

    pub fn with_label(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut labels = (*self.labels).clone();
        labels.insert(key.into(), value.into());
        let mut ctx = self.clone();
        ctx.labels = Arc::new(labels);
        ctx
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail fast if the context is already done.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes, the deadline passes, or the context
    /// is cancelled, whichever comes first.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        match self.deadline {
            Some(deadline) => {
                let deadline = tokio::time::Instant::from_std(deadline);
                tokio::select! {
                    outcome = tokio::time::timeout_at(deadline, fut) => {
                        outcome.map_err(|_| {
                            trace!("context deadline exceeded");
                            Error::DeadlineExceeded
                        })?
                    }
                    () = cancelled => Err(Error::Cancelled),
                }
            }
            None => {
                tokio::select! {
                    outcome = fut => outcome,
                    () = cancelled => Err(Error::Cancelled),
                }
            }
        }
    }
}

/// Cancels the context it was created with, and every context derived from it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        trace!("context cancelled");
        self.token.cancel();
    }
}
