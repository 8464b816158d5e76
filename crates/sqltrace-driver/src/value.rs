//! Parameter and column values exchanged with drivers.

use serde::{Deserialize, Serialize};

use crate::Result;

/// A value bound to a statement parameter or scanned from a result column.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Rust-side type a driver would scan this value into.
    pub fn scan_type(&self) -> ScanType {
        match self {
            Self::Null => ScanType::Any,
            Self::Integer(_) => ScanType::Integer,
            Self::Real(_) => ScanType::Real,
            Self::Boolean(_) => ScanType::Boolean,
            Self::Text(_) => ScanType::Text,
            Self::Blob(_) => ScanType::Blob,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Builds a `Vec<Value>` from heterogeneous literals.
///
/// Usage: `params![1_i64, "text", true]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        vec![$($crate::Value::from($val)),*]
    };
}

/// A parameter carrying its 1-based position and, optionally, a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub ordinal: usize,
    pub value: Value,
}

impl NamedValue {
    pub fn positional(ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: None,
            ordinal,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, ordinal: usize, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ordinal,
            value: value.into(),
        }
    }
}

/// Attach ordinals (starting at 1) to bare positional values.
pub fn values_to_named(values: &[Value]) -> Vec<NamedValue> {
    values
        .iter()
        .enumerate()
        .map(|(idx, value)| NamedValue::positional(idx + 1, value.clone()))
        .collect()
}

/// Strip names and ordinals, keeping argument order.
pub fn named_to_values(args: &[NamedValue]) -> Vec<Value> {
    args.iter().map(|arg| arg.value.clone()).collect()
}

/// Converts a parameter into a value the driver accepts.
pub trait ValueConverter: Send + Sync {
    fn convert(&self, value: Value) -> Result<Value>;
}

/// Converter used when a statement exposes none for a column.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {
    fn convert(&self, value: Value) -> Result<Value> {
        Ok(value)
    }
}

/// Rust-side type a column scans into. `Any` means "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanType {
    Any,
    Integer,
    Real,
    Boolean,
    Text,
    Blob,
}

/// Outcome of advancing a result-set cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Destination slots hold the next row.
    Row,
    /// The result set is exhausted.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    WriteCommitted,
    RepeatableRead,
    Snapshot,
    Serializable,
    Linearizable,
}

/// Options for a context-aware transaction begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
