//! Typed literal resolution.
//!
//! Every scalar token of a query goes through [`resolve_literal`]: it is
//! percent-decoded, then either dispatched to an explicit type tag
//! (`date:2017-01-01`) or auto-detected.
//!
//! Auto-detection tries a fixed list of resolvers and the first success wins:
//!
//! | Order | Resolver | Accepts |
//! |-------|----------|---------|
//! | 1 | boolean | `true`, `false` |
//! | 2 | null | `null` |
//! | 3 | integer | `42`, `-7` |
//! | 4 | float | `3.14`, `1e6`, `.5` |
//! | - | string | anything else |
//!
//! Dates, datetimes, epochs, UUIDs and decimals are never auto-detected.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use percent_encoding::percent_decode_str;
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::value::Value;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());

static FLOAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)(?:[eE][+-]?[0-9]+)?$").unwrap()
});

/// Errors produced while turning a token into a typed value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LiteralError {
    /// The text does not convert to the requested type.
    #[error("cannot convert '{text}' to {type_name}")]
    Conversion {
        type_name: &'static str,
        text: String,
    },

    /// The token contains a percent escape that is not valid UTF-8.
    #[error("invalid percent-encoding in '{0}'")]
    Encoding(String),
}

/// Explicit type tags accepted in `type:value` literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Null,
    Epoch,
    Date,
    DateTime,
    Uuid,
    Decimal,
}

impl TypeTag {
    pub const ALL: [TypeTag; 9] = [
        TypeTag::String,
        TypeTag::Number,
        TypeTag::Boolean,
        TypeTag::Null,
        TypeTag::Epoch,
        TypeTag::Date,
        TypeTag::DateTime,
        TypeTag::Uuid,
        TypeTag::Decimal,
    ];

    /// Looks up a tag by the name used before the colon.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Null => "null",
            TypeTag::Epoch => "epoch",
            TypeTag::Date => "date",
            TypeTag::DateTime => "datetime",
            TypeTag::Uuid => "uuid",
            TypeTag::Decimal => "decimal",
        }
    }

    /// Converts already-decoded text to this type.
    pub fn resolve(self, text: &str) -> Result<Value, LiteralError> {
        let resolved = match self {
            TypeTag::String => Some(Value::String(text.to_string())),
            TypeTag::Number => resolve_integer(text).or_else(|| resolve_float(text)),
            TypeTag::Boolean => resolve_boolean(text),
            TypeTag::Null if text.is_empty() => Some(Value::Null),
            TypeTag::Null => resolve_null(text),
            TypeTag::Epoch => resolve_epoch(text),
            TypeTag::Date => resolve_date(text),
            TypeTag::DateTime => resolve_datetime(text),
            TypeTag::Uuid => resolve_uuid(text),
            TypeTag::Decimal => resolve_decimal(text),
        };

        resolved.ok_or_else(|| LiteralError::Conversion {
            type_name: self.name(),
            text: text.to_string(),
        })
    }
}

/// Resolvers tried in order by auto-detection.
const AUTO_RESOLVERS: [fn(&str) -> Option<Value>; 4] = [
    resolve_boolean,
    resolve_null,
    resolve_integer,
    resolve_float,
];

/// Percent-decodes a raw token and resolves it to a typed value.
///
/// # Examples
///
/// ```
/// use rql_lang::literal::resolve_literal;
/// use rql_lang::Value;
///
/// assert_eq!(resolve_literal("10").unwrap(), Value::Integer(10));
/// assert_eq!(resolve_literal("string:10").unwrap(), Value::String("10".into()));
/// assert_eq!(resolve_literal("lero%20lero").unwrap(), Value::String("lero lero".into()));
/// ```
pub fn resolve_literal(raw: &str) -> Result<Value, LiteralError> {
    let text = percent_decode(raw)?;

    if let Some((prefix, rest)) = text.split_once(':')
        && let Some(tag) = TypeTag::from_name(prefix)
    {
        return tag.resolve(rest);
    }

    Ok(auto_detect(&text))
}

/// Auto-detects booleans, null, integers and floats; anything else is a string.
pub fn auto_detect(text: &str) -> Value {
    AUTO_RESOLVERS
        .iter()
        .find_map(|resolve| resolve(text))
        .unwrap_or_else(|| Value::String(text.to_string()))
}

pub fn percent_decode(raw: &str) -> Result<String, LiteralError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| LiteralError::Encoding(raw.to_string()))
}

fn resolve_boolean(text: &str) -> Option<Value> {
    match text {
        "true" => Some(Value::Boolean(true)),
        "false" => Some(Value::Boolean(false)),
        _ => None,
    }
}

fn resolve_null(text: &str) -> Option<Value> {
    (text == "null").then_some(Value::Null)
}

fn resolve_integer(text: &str) -> Option<Value> {
    if !INTEGER.is_match(text) {
        return None;
    }
    // Out-of-range integers fall through to the float resolver
    text.parse::<i64>().ok().map(Value::Integer)
}

fn resolve_float(text: &str) -> Option<Value> {
    if !FLOAT.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().map(Value::Float)
}

fn resolve_epoch(text: &str) -> Option<Value> {
    if !FLOAT.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().map(Value::Epoch)
}

fn resolve_date(text: &str) -> Option<Value> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(Value::Date)
}

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

fn resolve_datetime(text: &str) -> Option<Value> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Value::DateTime(dt));
    }

    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(Value::DateTime(dt));
        }
    }

    // Naive datetimes are taken as UTC
    let utc = FixedOffset::east_opt(0)?;
    NAIVE_DATETIME_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| Value::DateTime(naive.and_utc().with_timezone(&utc)))
    })
}

fn resolve_uuid(text: &str) -> Option<Value> {
    // Hyphenated (36) or simple hex (32); braced and urn forms are rejected
    if text.len() != 36 && text.len() != 32 {
        return None;
    }
    Uuid::try_parse(text).ok().map(Value::Uuid)
}

fn resolve_decimal(text: &str) -> Option<Value> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .map(Value::Decimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_detection_order() {
        assert_eq!(auto_detect("true"), Value::Boolean(true));
        assert_eq!(auto_detect("null"), Value::Null);
        assert_eq!(auto_detect("-7"), Value::Integer(-7));
        assert_eq!(auto_detect("1e6"), Value::Float(1_000_000.0));
        assert_eq!(auto_detect("123abc"), Value::String("123abc".into()));
        assert_eq!(auto_detect("inf"), Value::String("inf".into()));
    }

    #[test]
    fn huge_integers_become_floats() {
        assert_eq!(
            auto_detect("99999999999999999999"),
            Value::Float(99999999999999999999.0)
        );
    }

    #[test]
    fn unknown_prefix_is_not_a_tag() {
        assert_eq!(
            resolve_literal("mailto:someone").unwrap(),
            Value::String("mailto:someone".into())
        );
    }

    #[test]
    fn failed_conversion_names_the_type() {
        let err = resolve_literal("date:yesterday").unwrap_err();
        assert_eq!(err.to_string(), "cannot convert 'yesterday' to date");
    }
}
