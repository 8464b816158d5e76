//! # sqltrace
//!
//! Transparent instrumentation around a database driver.
//!
//! Every wrapper in this crate holds one driver primitive and forwards each
//! call to it unchanged, timing the call and reporting it to an
//! [`Observer`] afterwards. Exec and query failures additionally pass
//! through an optional error replacer that can swap a raw driver error for
//! an application error; the observer always sees the raw one.
//!
//! ```ignore
//! use sqltrace::{Config, Context, TracedConnector, TracingObserver};
//!
//! let connector = TracedConnector::from_connector(
//!     raw_connector,
//!     Config::new().with_observer(TracingObserver::new()),
//! )?;
//! let mut conn = connector.connect(&Context::background()).await?;
//! let mut stmt = conn.prepare("INSERT INTO users (name) VALUES (?)").await?;
//! stmt.exec(&sqltrace::params!["ada"]).await?;
//! stmt.close().await?;
//! ```
//!
//! Wrappers implement the driver traits themselves and advertise every
//! capability, so a traced connector can be handed to code that expects a
//! plain [`Connector`], or wrapped again.

pub mod config;
pub mod connection;
pub mod connector;
pub mod observer;
pub mod replacer;
pub mod result;
pub mod rows;
pub mod statement;
pub mod trace;
pub mod transaction;

pub use config::Config;
pub use connection::TracedConn;
pub use connector::TracedConnector;
pub use observer::{NoopObserver, Observer};
pub use replacer::{ErrorReplacer, noop_replacer};
pub use result::TracedResult;
pub use rows::TracedRows;
pub use statement::TracedStmt;
pub use trace::TracingObserver;
pub use transaction::TracedTx;

pub use sqltrace_driver::{
    BoxError, CancelHandle, Connector, Context, Driver, Error, IsolationLevel, NamedValue,
    Result, ScanType, StepResult, TxOptions, Value, params,
};
