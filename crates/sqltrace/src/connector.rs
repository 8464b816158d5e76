//! Instrumented entry point.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sqltrace_driver::{Conn, Connector, Context, Driver, Result};
use tracing::debug;

use crate::config::{Config, Settings};
use crate::connection::TracedConn;

enum Source {
    Connector(Arc<dyn Connector>),
    Driver { driver: Arc<dyn Driver>, dsn: String },
}

/// Connector that times every `connect` and hands out [`TracedConn`]s
/// sharing one observer and error replacer.
///
/// ```ignore
/// let connector = TracedConnector::from_driver(
///     LibsqlDriver,
///     ":memory:",
///     Config::new().with_observer(TracingObserver::new()),
/// )?;
/// let mut conn = connector.connect(&Context::background()).await?;
/// ```
pub struct TracedConnector {
    settings: Settings,
    source: Source,
}

impl TracedConnector {
    /// Wrap an existing connector. Fails with `Error::MissingObserver` when
    /// the configuration has no observer.
    pub fn from_connector(connector: impl Connector + 'static, config: Config) -> Result<Self> {
        Self::from_shared_connector(Arc::new(connector), config)
    }

    pub fn from_shared_connector(connector: Arc<dyn Connector>, config: Config) -> Result<Self> {
        let settings = config.into_settings()?;
        debug!("traced connector built over connector");
        Ok(Self {
            settings,
            source: Source::Connector(connector),
        })
    }

    /// Wrap a driver that opens every connection from the same DSN.
    pub fn from_driver(
        driver: impl Driver + 'static,
        dsn: impl Into<String>,
        config: Config,
    ) -> Result<Self> {
        let settings = config.into_settings()?;
        debug!("traced connector built over driver");
        Ok(Self {
            settings,
            source: Source::Driver {
                driver: Arc::new(driver),
                dsn: dsn.into(),
            },
        })
    }

    pub async fn connect(&self, ctx: &Context) -> Result<TracedConn> {
        let started = Instant::now();
        let outcome = match &self.source {
            Source::Connector(connector) => connector.connect(ctx).await,
            Source::Driver { driver, dsn } => driver.open(dsn).await,
        };
        let elapsed = started.elapsed();

        self.settings
            .observer
            .connect(ctx, outcome.as_ref().err(), elapsed);
        let conn = outcome?;
        Ok(TracedConn::new(self.settings.clone(), ctx.clone(), conn))
    }

    pub fn driver(&self) -> &dyn Driver {
        match &self.source {
            Source::Connector(connector) => connector.driver(),
            Source::Driver { driver, .. } => driver.as_ref(),
        }
    }
}

#[async_trait]
impl Connector for TracedConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        let conn = TracedConnector::connect(self, ctx).await?;
        Ok(Box::new(conn))
    }

    fn driver(&self) -> &dyn Driver {
        TracedConnector::driver(self)
    }
}

impl std::fmt::Debug for TracedConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Connector(_) => "connector",
            Source::Driver { .. } => "driver",
        };
        f.debug_struct("TracedConnector")
            .field("source", &source)
            .finish_non_exhaustive()
    }
}
