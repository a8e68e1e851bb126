use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use uuid::Uuid;

use crate::literal::TypeTag;

/// A single record of the collection being queried.
pub type Record = HashMap<String, Value>;

/// A value used throughout the RQL parser and query engine.
///
/// Literal arguments in a call-tree and the fields of the records being
/// queried share this type, so filters compare them directly.
///
/// # Type Preservation
///
/// The language keeps integers, floats and decimals apart:
/// - `10` resolves to an integer, `3.14` and `1e6` to floats
/// - `decimal:0.1` keeps its exact textual precision
/// - dates, datetimes, epochs and UUIDs only appear through explicit tags
///
/// # Examples
///
/// ```
/// use rql_lang::Value;
/// use std::collections::HashMap;
///
/// // Scalar values
/// let null = Value::Null;
/// let boolean = Value::Boolean(true);
/// let integer = Value::Integer(42);
/// let float = Value::Float(3.14);
/// let string = Value::String("hello".to_string());
///
/// // Collections
/// let array = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
///
/// let mut obj = HashMap::new();
/// obj.insert("key".to_string(), Value::String("value".to_string()));
/// let object = Value::Object(obj);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `null`
    Null,

    /// `true` / `false`
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string, also used for bare field names
    String(String),

    /// Arbitrary-precision decimal (`decimal:0.1`)
    Decimal(Decimal),

    /// Calendar date (`date:2017-01-01`)
    Date(NaiveDate),

    /// Date and time with offset (`datetime:2009-02-13T23:31:30Z`)
    DateTime(DateTime<FixedOffset>),

    /// Seconds since the Unix epoch (`epoch:1234567890`)
    Epoch(f64),

    /// UUID (`uuid:ff27483c-ee08-4b27-922d-aab2de4b9849`)
    Uuid(Uuid),

    /// Ordered tuple of values (`(a,b,c)`)
    Array(Vec<Value>),

    /// Nested structure inside a record
    Object(Record),
}

impl Value {
    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Epoch(_) => "epoch",
            Value::Uuid(_) => "uuid",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// True for integers, floats and decimals.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_) | Value::Decimal(_))
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Epoch(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Get as integer. Floats only convert when they are whole.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as the query engine sees it.
    ///
    /// Numbers compare by value across variants and strings coerce to typed
    /// literals, so `Integer(1)` equals `Float(1.0)` here although the derived
    /// `PartialEq` keeps them apart. Values of unrelated kinds are unequal.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => records_eq(a, b),
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => compare_values(self, other) == Some(Ordering::Equal),
        }
    }
}

/// Loose equality over whole records, used by `distinct()` and grouping.
pub fn records_eq(a: &Record, b: &Record) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .all(|(k, v)| b.get(k).is_some_and(|other| v.loose_eq(other)))
}

/// Compares two values.
///
/// Returns `None` when the values are incomparable (different kinds, NaN,
/// or a string that does not resolve to the other side's type).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    use Value::*;

    match (a, b) {
        (Null, Null) => Some(Ordering::Equal),
        (Boolean(x), Boolean(y)) => Some(x.cmp(y)),
        (String(x), String(y)) => Some(x.cmp(y)),
        (Date(x), Date(y)) => Some(x.cmp(y)),
        (DateTime(x), DateTime(y)) => Some(x.cmp(y)),
        (Uuid(x), Uuid(y)) => Some(x.cmp(y)),

        (Epoch(x), DateTime(y)) => x.partial_cmp(&timestamp_seconds(y)),
        (DateTime(x), Epoch(y)) => timestamp_seconds(x).partial_cmp(y),

        (Array(x), Array(y)) => {
            for (left, right) in x.iter().zip(y) {
                match compare_values(left, right)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(x.len().cmp(&y.len()))
        }

        // Strings coming from JSON records stand in for typed literals
        (String(s), typed @ (Decimal(_) | Date(_) | DateTime(_) | Uuid(_))) => {
            let resolved = coerce_string(s, typed)?;
            compare_values(&resolved, typed)
        }
        (typed @ (Decimal(_) | Date(_) | DateTime(_) | Uuid(_)), String(s)) => {
            let resolved = coerce_string(s, typed)?;
            compare_values(typed, &resolved)
        }

        _ if is_number_like(a) && is_number_like(b) => compare_numbers(a, b),
        _ => None,
    }
}

fn is_number_like(v: &Value) -> bool {
    matches!(
        v,
        Value::Integer(_) | Value::Float(_) | Value::Decimal(_) | Value::Epoch(_)
    )
}

/// Numeric comparison across integer, float, decimal and epoch values.
///
/// Exact integer and decimal comparisons are kept when no float is involved.
fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
        (Value::Integer(x), Value::Decimal(y)) => Some(Decimal::from(*x).cmp(y)),
        (Value::Decimal(x), Value::Integer(y)) => Some(x.cmp(&Decimal::from(*y))),
        (Value::Decimal(x), other) | (other, Value::Decimal(x)) => {
            let ordering = match Decimal::from_f64(other.as_float()?) {
                Some(converted) => x.cmp(&converted),
                None => x.to_f64()?.partial_cmp(&other.as_float()?)?,
            };
            if matches!(a, Value::Decimal(_)) {
                Some(ordering)
            } else {
                Some(ordering.reverse())
            }
        }
        _ => a.as_float()?.partial_cmp(&b.as_float()?),
    }
}

fn coerce_string(text: &str, like: &Value) -> Option<Value> {
    let tag = match like {
        Value::Decimal(_) => TypeTag::Decimal,
        Value::Date(_) => TypeTag::Date,
        Value::DateTime(_) => TypeTag::DateTime,
        Value::Uuid(_) => TypeTag::Uuid,
        _ => return None,
    };
    tag.resolve(text).ok()
}

fn timestamp_seconds(dt: &DateTime<FixedOffset>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record)
    }
}
