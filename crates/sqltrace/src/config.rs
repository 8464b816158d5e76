//! Decorator configuration.

use std::sync::Arc;

use sqltrace_driver::{BoxError, Error, Result};

use crate::observer::Observer;
use crate::replacer::{ErrorReplacer, noop_replacer};

/// Observer (required) and error replacer (optional) shared by every
/// wrapper a connector produces.
#[derive(Clone, Default)]
pub struct Config {
    observer: Option<Arc<dyn Observer>>,
    replacer: Option<ErrorReplacer>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(self, observer: impl Observer + 'static) -> Self {
        self.with_shared_observer(Arc::new(observer))
    }

    /// Install an observer that the application keeps a handle to.
    pub fn with_shared_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_replacer(
        mut self,
        replacer: impl Fn(&Error) -> Option<BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.replacer = Some(Arc::new(replacer));
        self
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn has_replacer(&self) -> bool {
        self.replacer.is_some()
    }

    /// A configuration is usable once it has an observer. A missing
    /// replacer is filled in with one that never substitutes.
    pub fn validate(&self) -> Result<()> {
        if self.observer.is_none() {
            return Err(Error::MissingObserver);
        }
        Ok(())
    }

    pub(crate) fn into_settings(self) -> Result<Settings> {
        self.validate()?;
        let observer = self.observer.ok_or(Error::MissingObserver)?;
        Ok(Settings {
            observer,
            replacer: self.replacer.unwrap_or_else(noop_replacer),
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_observer", &self.observer.is_some())
            .field("has_replacer", &self.replacer.is_some())
            .finish()
    }
}

/// Validated configuration carried by connection and statement wrappers.
#[derive(Clone)]
pub(crate) struct Settings {
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) replacer: ErrorReplacer,
}
