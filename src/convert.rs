//! JSON <-> RQL value conversion utilities

use chrono::SecondsFormat;

use crate::{
    ast::{Arg, Call},
    evaluator::EvalError,
    value::{Record, Value},
};

/// Convert serde_json::Value to an RQL Value
///
/// JSON has no decimals, dates or UUIDs: those arrive as strings and are
/// compared against typed literals by coercion.
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert an RQL Value to serde_json::Value
///
/// Decimals render as strings to keep their precision; dates, datetimes and
/// UUIDs use their canonical text forms.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) | Value::Epoch(f) => float_to_json(*f),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Decimal(d) => serde_json::Value::String(d.to_string()),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::DateTime(dt) => {
            serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        Value::Uuid(u) => serde_json::Value::String(u.hyphenated().to_string()),
        Value::Array(arr) => serde_json::Value::Array(arr.iter().map(value_to_json).collect()),
        Value::Object(obj) => record_to_json(obj),
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Convert a record to a JSON object
pub fn record_to_json(record: &Record) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    )
}

/// Convert a JSON array of objects into records
pub fn records_from_json(v: serde_json::Value) -> Result<Vec<Record>, EvalError> {
    let items = match v {
        serde_json::Value::Array(items) => items,
        other => {
            return Err(EvalError::TypeError(format!(
                "input must be an array of objects, got {}",
                json_to_value(other).type_name()
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match json_to_value(item) {
            Value::Object(record) => Ok(record),
            other => Err(EvalError::TypeError(format!(
                "input element {} must be an object, got {}",
                i,
                other.type_name()
            ))),
        })
        .collect()
}

/// Convert a call-tree to JSON as `{"name": ..., "args": [...]}`
///
/// Sort keys render as `["+", key]` / `["-", key]`.
pub fn call_to_json(call: &Call) -> serde_json::Value {
    let args = call
        .args
        .iter()
        .map(|arg| match arg {
            Arg::Call(nested) => call_to_json(nested),
            Arg::Value(value) => value_to_json(value),
            Arg::Sort(key) => serde_json::Value::Array(vec![
                serde_json::Value::String(key.dir.prefix().to_string()),
                value_to_json(&key.key),
            ]),
        })
        .collect();

    serde_json::json!({
        "name": call.name,
        "args": serde_json::Value::Array(args),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_values_render_as_text() {
        let date = crate::literal::resolve_literal("date:2017-01-01").unwrap();
        assert_eq!(value_to_json(&date), json!("2017-01-01"));

        let decimal = crate::literal::resolve_literal("decimal:1.10").unwrap();
        assert_eq!(value_to_json(&decimal), json!("1.10"));

        let dt = crate::literal::resolve_literal("datetime:2009-02-13T23:31:30Z").unwrap();
        assert_eq!(value_to_json(&dt), json!("2009-02-13T23:31:30Z"));
    }

    #[test]
    fn non_array_input_is_rejected() {
        assert!(records_from_json(json!({"a": 1})).is_err());
        assert!(records_from_json(json!([{"a": 1}, 2])).is_err());
        assert_eq!(records_from_json(json!([{"a": 1}])).unwrap().len(), 1);
    }

    #[test]
    fn sort_keys_in_call_json() {
        let call = crate::parse("sort(-price,+name)").unwrap();
        assert_eq!(
            call_to_json(&call),
            json!({"name": "sort", "args": [["-", "price"], ["+", "name"]]})
        );
    }
}
