//! Instrumented transaction.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqltrace_driver::{Context, Result, Tx};

use crate::observer::Observer;

/// Transaction whose commit and rollback are timed and reported under the
/// context it was begun with. Errors are never substituted here.
pub struct TracedTx {
    observer: Arc<dyn Observer>,
    ctx: Context,
    tx: Box<dyn Tx>,
}

impl TracedTx {
    pub(crate) fn new(observer: Arc<dyn Observer>, ctx: Context, tx: Box<dyn Tx>) -> Self {
        Self { observer, ctx, tx }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub async fn commit(&mut self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.tx.commit().await;
        let elapsed = started.elapsed();

        self.observer
            .tx_commit(&self.ctx, outcome.as_ref().err(), elapsed);
        outcome
    }

    pub async fn rollback(&mut self) -> Result<()> {
        let started = Instant::now();
        let outcome = self.tx.rollback().await;
        let elapsed = started.elapsed();

        self.observer
            .tx_rollback(&self.ctx, outcome.as_ref().err(), elapsed);
        outcome
    }
}

#[async_trait]
impl Tx for TracedTx {
    async fn commit(&mut self) -> Result<()> {
        TracedTx::commit(self).await
    }

    async fn rollback(&mut self) -> Result<()> {
        TracedTx::rollback(self).await
    }
}

impl std::fmt::Debug for TracedTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedTx")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
