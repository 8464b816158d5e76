//! # sqltrace-libsql
//!
//! libsql driver for the `sqltrace-driver` contract.
//!
//! DSNs accepted by [`LibsqlDriver`] and [`LibsqlConnector`]:
//!
//! - `:memory:` for a private in-memory database
//! - a filesystem path, optionally prefixed with `file:`
//! - `libsql://`, `https://` or `http://` URLs carrying an `authToken`
//!   query parameter
//!
//! Every connection supports the context-aware capabilities; deadlines and
//! cancellation are enforced around the libsql call.

pub mod connection;
pub mod rows;
pub mod statement;
mod value;

use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Builder, Database};
use percent_encoding::percent_decode_str;
use sqltrace_driver::{Conn, Connector, Context, Driver, Error, Result};
use tracing::debug;

pub use connection::{LibsqlConn, LibsqlResult, LibsqlTx};
pub use rows::LibsqlRows;
pub use statement::LibsqlStmt;

/// Where a DSN points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Memory,
    Local(String),
    Remote { url: String, auth_token: String },
}

impl Target {
    pub fn parse(dsn: &str) -> Result<Self> {
        let dsn = dsn.trim();
        if dsn.is_empty() {
            return Err(Error::Config {
                details: "database DSN must be provided".to_string(),
            });
        }

        if is_in_memory_url(dsn) {
            return Ok(Self::Memory);
        }

        if is_remote_url(dsn) {
            let (url, query) = dsn.split_once('?').unwrap_or((dsn, ""));
            let encoded = query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "authToken")
                .map(|(_, value)| value)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| Error::Config {
                    details: "authToken is required for remote databases".to_string(),
                })?;
            let auth_token = percent_decode_str(encoded)
                .decode_utf8()
                .map_err(|err| Error::Config {
                    details: format!("authToken is not valid UTF-8: {err}"),
                })?
                .into_owned();
            return Ok(Self::Remote {
                url: url.to_string(),
                auth_token,
            });
        }

        let path = dsn.strip_prefix("file:").unwrap_or(dsn);
        Ok(Self::Local(path.to_string()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local(_) => "local",
            Self::Remote { .. } => "remote",
        }
    }

    async fn build(&self) -> Result<Database> {
        debug!(kind = self.kind(), "opening libsql database");
        let database = match self {
            Self::Memory => Builder::new_local(":memory:").build().await,
            Self::Local(path) => Builder::new_local(path).build().await,
            Self::Remote { url, auth_token } => {
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
            }
        };
        database.map_err(Error::driver)
    }
}

/// True for DSNs served over the network (`libsql://`, `https://`, `http://`).
pub fn is_remote_url(url: &str) -> bool {
    url.starts_with("libsql://") || url.starts_with("https://") || url.starts_with("http://")
}

fn is_in_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("file::memory:") || url.contains("mode=memory")
}

/// Opens a fresh database handle per connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibsqlDriver;

#[async_trait]
impl Driver for LibsqlDriver {
    async fn open(&self, dsn: &str) -> Result<Box<dyn Conn>> {
        let database = Arc::new(Target::parse(dsn)?.build().await?);
        let conn = database.connect().map_err(Error::driver)?;
        Ok(Box::new(LibsqlConn::new(database, conn)))
    }
}

/// Builds the database once and hands out connections to it.
///
/// With `:memory:` every connection sees its own empty database.
pub struct LibsqlConnector {
    target: Target,
    database: Arc<Database>,
}

impl LibsqlConnector {
    pub async fn open(dsn: &str) -> Result<Self> {
        let target = Target::parse(dsn)?;
        let database = Arc::new(target.build().await?);
        Ok(Self { target, database })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

#[async_trait]
impl Connector for LibsqlConnector {
    async fn connect(&self, ctx: &Context) -> Result<Box<dyn Conn>> {
        ctx.check()?;
        let conn = self.database.connect().map_err(Error::driver)?;
        Ok(Box::new(LibsqlConn::new(self.database.clone(), conn)))
    }

    fn driver(&self) -> &dyn Driver {
        &LibsqlDriver
    }
}

impl std::fmt::Debug for LibsqlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlConnector")
            .field("kind", &self.target.kind())
            .finish_non_exhaustive()
    }
}
