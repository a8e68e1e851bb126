// tests/literal_tests.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use proptest::prelude::*;
use rql_lang::literal::{LiteralError, TypeTag, auto_detect, percent_decode, resolve_literal};
use rql_lang::Value;
use rust_decimal::Decimal;
use uuid::Uuid;

fn resolve(raw: &str) -> Value {
    resolve_literal(raw).unwrap()
}

// ============================================================================
// Auto-detection
// ============================================================================

#[test]
fn test_auto_detected_types() {
    assert_eq!(resolve("10"), Value::Integer(10));
    assert_eq!(resolve("-10"), Value::Integer(-10));
    assert_eq!(resolve("3.14"), Value::Float(3.14));
    assert_eq!(resolve(".5"), Value::Float(0.5));
    assert_eq!(resolve("1e6"), Value::Float(1_000_000.0));
    assert_eq!(resolve("true"), Value::Boolean(true));
    assert_eq!(resolve("false"), Value::Boolean(false));
    assert_eq!(resolve("null"), Value::Null);
    assert_eq!(resolve("lero"), Value::from("lero"));
}

#[test]
fn test_dates_are_not_auto_detected() {
    assert_eq!(resolve("2017-01-01"), Value::from("2017-01-01"));
    assert_eq!(
        resolve("ff27483c-ee08-4b27-922d-aab2de4b9849"),
        Value::from("ff27483c-ee08-4b27-922d-aab2de4b9849")
    );
}

#[test]
fn test_untagged_colons_stay_strings() {
    assert_eq!(resolve("a:b"), Value::from("a:b"));
    assert_eq!(resolve("user@example.com"), Value::from("user@example.com"));
    assert_eq!(resolve("http://x"), Value::from("http://x"));
}

// ============================================================================
// Explicit tags
// ============================================================================

#[test]
fn test_string_and_number_tags() {
    assert_eq!(resolve("string:1"), Value::from("1"));
    assert_eq!(resolve("string:"), Value::from(""));
    assert_eq!(resolve("number:1"), Value::Integer(1));
    assert_eq!(resolve("number:1.5"), Value::Float(1.5));
    assert_eq!(resolve("boolean:true"), Value::Boolean(true));
    assert_eq!(resolve("null:"), Value::Null);
    assert_eq!(resolve("null:null"), Value::Null);
}

#[test]
fn test_date_tag() {
    assert_eq!(
        resolve("date:2017-01-01"),
        Value::Date(NaiveDate::from_ymd_opt(2017, 1, 1).unwrap())
    );
}

#[test]
fn test_datetime_tag() {
    let expected = DateTime::parse_from_rfc3339("2009-02-13T23:31:30Z").unwrap();
    assert_eq!(resolve("datetime:2009-02-13T23:31:30Z"), Value::DateTime(expected));
    assert_eq!(resolve("datetime:2009-02-13T23:31:30"), Value::DateTime(expected));
    assert_eq!(resolve("datetime:2009-02-13 23:31:30"), Value::DateTime(expected));
    assert_eq!(
        resolve("datetime:2009-02-14T01:31:30%2B02:00"),
        Value::DateTime(expected)
    );
    assert_eq!(
        resolve("datetime:2009-02-14T01:31:30+0200"),
        Value::DateTime(expected)
    );
}

#[test]
fn test_datetime_fractional_seconds() {
    let Value::DateTime(dt) = resolve("datetime:2009-02-13T23:31:30.250Z") else {
        panic!("expected a datetime");
    };
    assert_eq!(dt.timestamp_subsec_millis(), 250);
}

#[test]
fn test_epoch_tag() {
    assert_eq!(resolve("epoch:1234567890"), Value::Epoch(1_234_567_890.0));
    assert_eq!(resolve("epoch:1.5"), Value::Epoch(1.5));
}

#[test]
fn test_uuid_tag() {
    let expected = Uuid::parse_str("ff27483c-ee08-4b27-922d-aab2de4b9849").unwrap();
    assert_eq!(
        resolve("uuid:ff27483c-ee08-4b27-922d-aab2de4b9849"),
        Value::Uuid(expected)
    );
    assert_eq!(
        resolve("uuid:ff27483cee084b27922daab2de4b9849"),
        Value::Uuid(expected)
    );
}

#[test]
fn test_decimal_tag_keeps_scale() {
    let Value::Decimal(d) = resolve("decimal:1.10") else {
        panic!("expected a decimal");
    };
    assert_eq!(d.to_string(), "1.10");
    assert_eq!(resolve("decimal:1e2"), Value::Decimal(Decimal::from_str("100").unwrap()));
}

#[test]
fn test_tag_lookup() {
    assert_eq!(TypeTag::from_name("datetime"), Some(TypeTag::DateTime));
    assert_eq!(TypeTag::from_name("mailto"), None);
    for tag in TypeTag::ALL {
        assert_eq!(TypeTag::from_name(tag.name()), Some(tag));
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_conversion_errors() {
    let cases = [
        ("number:ten", "number"),
        ("boolean:yes", "boolean"),
        ("null:nil", "null"),
        ("epoch:yesterday", "epoch"),
        ("date:2017-13-01", "date"),
        ("datetime:noon", "datetime"),
        ("uuid:1234", "uuid"),
        ("decimal:1.2.3", "decimal"),
    ];
    for (raw, type_name) in cases {
        match resolve_literal(raw) {
            Err(LiteralError::Conversion { type_name: t, .. }) => assert_eq!(t, type_name),
            other => panic!("{} resolved to {:?}", raw, other),
        }
    }
}

#[test]
fn test_conversion_message() {
    assert_eq!(
        resolve_literal("number:ten").unwrap_err().to_string(),
        "cannot convert 'ten' to number"
    );
}

#[test]
fn test_invalid_percent_encoding() {
    assert!(matches!(
        resolve_literal("%C3%28"),
        Err(LiteralError::Encoding(_))
    ));
}

#[test]
fn test_percent_decode() {
    assert_eq!(percent_decode("lero%20lero").unwrap(), "lero lero");
    assert_eq!(percent_decode("caf%C3%A9").unwrap(), "café");
    assert_eq!(percent_decode("100%").unwrap(), "100%");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_decoding_plain_text_is_identity(text in "[A-Za-z0-9 _.:-]{0,20}") {
        prop_assert_eq!(percent_decode(&text).unwrap(), text);
    }

    #[test]
    fn prop_decoding_is_idempotent_without_escapes(text in "[^%]{0,20}") {
        let once = percent_decode(&text).unwrap();
        let twice = percent_decode(&once).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_integers_resolve_exactly(n in any::<i64>()) {
        prop_assert_eq!(auto_detect(&n.to_string()), Value::Integer(n));
    }

    #[test]
    fn prop_string_tag_is_verbatim(text in "[A-Za-z0-9 _.:-]{0,20}") {
        prop_assert_eq!(
            resolve_literal(&format!("string:{}", text)).unwrap(),
            Value::String(text)
        );
    }
}
