//! Argument parsing and JSON rendering for statement results.

use serde_json::{Map, Number, json};
use sqltrace::{TracedResult, Value};

/// Interpret a command-line argument as a SQL value.
///
/// `null`, `true` and `false` are literals, then integers, then finite
/// reals. Everything else binds as text.
pub fn parse_arg(raw: &str) -> Value {
    match raw {
        "null" => return Value::Null,
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Integer(int);
    }
    match raw.parse::<f64>() {
        Ok(real) if real.is_finite() => Value::Real(real),
        _ => Value::Text(raw.to_string()),
    }
}

pub fn parse_args(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|arg| parse_arg(arg)).collect()
}

pub fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(int) => json!(int),
        Value::Real(real) => Number::from_f64(*real)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(text) => json!(text),
        Value::Blob(bytes) => json!(bytes),
        Value::Boolean(flag) => json!(flag),
    }
}

/// One row as an object keyed by column name.
pub fn row_json(columns: &[String], values: &[Value]) -> serde_json::Value {
    let row: Map<String, serde_json::Value> = columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.clone(), value_json(value)))
        .collect();
    serde_json::Value::Object(row)
}

pub fn result_json(result: &TracedResult) -> anyhow::Result<serde_json::Value> {
    Ok(json!({
        "rows_affected": result.rows_affected()?,
        "last_insert_id": result.last_insert_id()?,
    }))
}
