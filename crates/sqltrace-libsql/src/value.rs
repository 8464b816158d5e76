//! Conversions between sqltrace values and libsql values.

use libsql::params::Params;
use sqltrace_driver::{NamedValue, ScanType, Value};

pub(crate) fn to_libsql(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Integer(value) => libsql::Value::Integer(*value),
        Value::Real(value) => libsql::Value::Real(*value),
        Value::Boolean(value) => libsql::Value::Integer(i64::from(*value)),
        Value::Text(value) => libsql::Value::Text(value.clone()),
        Value::Blob(value) => libsql::Value::Blob(value.clone()),
    }
}

pub(crate) fn from_libsql(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(value) => Value::Integer(value),
        libsql::Value::Real(value) => Value::Real(value),
        libsql::Value::Text(value) => Value::Text(value),
        libsql::Value::Blob(value) => Value::Blob(value),
    }
}

pub(crate) fn positional(args: &[Value]) -> Params {
    if args.is_empty() {
        return Params::None;
    }
    Params::Positional(args.iter().map(to_libsql).collect())
}

/// Bind by name when every argument carries one, by position otherwise.
pub(crate) fn named(args: &[NamedValue]) -> Params {
    if args.is_empty() {
        return Params::None;
    }
    if args.iter().all(|arg| arg.name.is_some()) {
        return Params::Named(
            args.iter()
                .map(|arg| {
                    let name = arg.name.as_deref().unwrap_or_default();
                    (placeholder(name), to_libsql(&arg.value))
                })
                .collect(),
        );
    }

    let mut ordered: Vec<&NamedValue> = args.iter().collect();
    ordered.sort_by_key(|arg| arg.ordinal);
    Params::Positional(ordered.into_iter().map(|arg| to_libsql(&arg.value)).collect())
}

fn placeholder(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

/// Scan type implied by a declared column type, following SQLite's
/// affinity rules.
pub(crate) fn scan_type_for(decl_type: &str) -> ScanType {
    let decl = decl_type.to_ascii_uppercase();
    if decl.contains("BOOL") {
        ScanType::Boolean
    } else if decl.contains("INT") {
        ScanType::Integer
    } else if decl.contains("CHAR") || decl.contains("CLOB") || decl.contains("TEXT") {
        ScanType::Text
    } else if decl.contains("BLOB") {
        ScanType::Blob
    } else if decl.contains("REAL") || decl.contains("FLOA") || decl.contains("DOUB") {
        ScanType::Real
    } else {
        ScanType::Any
    }
}
