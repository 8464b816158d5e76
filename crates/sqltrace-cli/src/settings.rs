//! Settings file and flag merging.

use std::path::{Path, PathBuf};
use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use sqltrace::TracingObserver;
use sqltrace_libsql::is_remote_url;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("no database configured; pass --database, set SQLTRACE_DATABASE or add `database` to the settings file")]
    MissingDatabase,
}

/// Settings file layout.
///
/// ```yaml
/// database: libsql://app.example.io
/// auth_token: secret
/// log:
///   statements: true
///   parameters: false
///   slow_ms: 250
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub database: Option<String>,
    pub auth_token: Option<String>,
    pub log: LogFile,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogFile {
    pub statements: bool,
    pub parameters: bool,
    pub slow_ms: Option<u64>,
}

impl Default for LogFile {
    fn default() -> Self {
        Self {
            statements: true,
            parameters: false,
            slow_ms: None,
        }
    }
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }
}

/// Values taken from the command line (and its environment fallbacks).
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub database: Option<String>,
    pub auth_token: Option<String>,
    pub log_params: bool,
    pub slow_ms: Option<u64>,
}

/// Fully resolved settings. Flags win over the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dsn: String,
    pub log_statements: bool,
    pub log_parameters: bool,
    pub slow_threshold: Option<Duration>,
}

impl Settings {
    pub fn resolve(overrides: Overrides, file: FileSettings) -> Result<Self, SettingsError> {
        let database = overrides
            .database
            .or(file.database)
            .filter(|dsn| !dsn.trim().is_empty())
            .ok_or(SettingsError::MissingDatabase)?;
        let auth_token = overrides.auth_token.or(file.auth_token);

        Ok(Self {
            dsn: dsn_with_token(&database, auth_token.as_deref()),
            log_statements: file.log.statements,
            log_parameters: overrides.log_params || file.log.parameters,
            slow_threshold: overrides
                .slow_ms
                .or(file.log.slow_ms)
                .map(Duration::from_millis),
        })
    }

    pub fn observer(&self) -> TracingObserver {
        let observer = TracingObserver::new()
            .with_statement_logging(self.log_statements)
            .with_parameter_logging(self.log_parameters);
        match self.slow_threshold {
            Some(threshold) => observer.with_slow_threshold(threshold),
            None => observer,
        }
    }
}

/// Attach the auth token to a remote DSN that does not already carry one.
/// The token is percent-encoded so `&` and `=` survive the query string.
fn dsn_with_token(dsn: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if is_remote_url(dsn) && !dsn.contains("authToken=") => {
            let separator = if dsn.contains('?') { '&' } else { '?' };
            let token = utf8_percent_encode(token, NON_ALPHANUMERIC);
            format!("{dsn}{separator}authToken={token}")
        }
        _ => dsn.to_string(),
    }
}
