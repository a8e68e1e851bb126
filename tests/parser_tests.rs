// tests/parser_tests.rs

use proptest::prelude::*;
use rql_lang::{Arg, Call, ParseErrorKind, SortKey, Value, parse};

fn call(name: &str, args: Vec<Arg>) -> Call {
    Call::new(name, args)
}

fn eq(field: &str, value: Value) -> Call {
    call("eq", vec![field.into(), value.into()])
}

fn array(items: Vec<Value>) -> Value {
    Value::Array(items)
}

// ============================================================================
// Implicit comparisons
// ============================================================================

#[test]
fn test_key_value_is_eq() {
    assert_eq!(parse("key=value").unwrap(), parse("eq(key,value)").unwrap());
}

#[test]
fn test_typed_key_values() {
    assert_eq!(parse("ten=10").unwrap(), eq("ten", Value::Integer(10)));
    assert_eq!(parse("pi=3.14").unwrap(), eq("pi", Value::Float(3.14)));
    assert_eq!(parse("mil=1e6").unwrap(), eq("mil", Value::Float(1_000_000.0)));
    assert_eq!(parse("a=true").unwrap(), eq("a", Value::Boolean(true)));
    assert_eq!(parse("a=false").unwrap(), eq("a", Value::Boolean(false)));
    assert_eq!(parse("a=null").unwrap(), eq("a", Value::Null));
}

#[test]
fn test_string_tag() {
    assert_eq!(parse("a=string:1").unwrap(), eq("a", Value::from("1")));
    assert_eq!(parse("a=number:10").unwrap(), eq("a", Value::Integer(10)));
}

#[test]
fn test_percent_decoding() {
    assert_eq!(
        parse("eq(foo,lero%20lero)").unwrap(),
        parse("eq(foo,lero lero)").unwrap()
    );
    assert_eq!(
        parse("eq(a,x%26y)").unwrap(),
        eq("a", Value::from("x&y"))
    );
}

#[test]
fn test_fiql_form() {
    assert_eq!(
        parse("price=lt=10").unwrap(),
        call("lt", vec!["price".into(), Value::Integer(10).into()])
    );
    assert_eq!(parse("a=eq=1").unwrap(), parse("a=1").unwrap());
}

#[test]
fn test_tuple_key() {
    assert_eq!(
        parse("(a,b)=1").unwrap(),
        call(
            "eq",
            vec![array(vec!["a".into(), "b".into()]).into(), Value::Integer(1).into()]
        )
    );
}

#[test]
fn test_whitespace() {
    assert_eq!(
        parse("  eq( a , lero lero )  ").unwrap(),
        eq("a", Value::from("lero lero"))
    );
}

// ============================================================================
// Combinators
// ============================================================================

#[test]
fn test_implicit_and() {
    assert_eq!(
        parse("a=1&b=2&c=3").unwrap(),
        call(
            "and",
            vec![
                eq("a", Value::Integer(1)).into(),
                eq("b", Value::Integer(2)).into(),
                eq("c", Value::Integer(3)).into(),
            ]
        )
    );
}

#[test]
fn test_top_level_comma_is_and() {
    assert_eq!(parse("a=1,b=2").unwrap(), parse("a=1&b=2").unwrap());
}

#[test]
fn test_or_group() {
    assert_eq!(
        parse("(a=1|b=2)").unwrap(),
        call(
            "or",
            vec![eq("a", Value::Integer(1)).into(), eq("b", Value::Integer(2)).into()]
        )
    );
    assert_eq!(
        parse("(a=1|b=2)").unwrap(),
        parse("or(eq(a,1),eq(b,2))").unwrap()
    );
}

#[test]
fn test_and_group() {
    assert_eq!(
        parse("(a=1&b=2)").unwrap(),
        parse("and(eq(a,1),eq(b,2))").unwrap()
    );
}

#[test]
fn test_single_clause_group() {
    assert_eq!(parse("((a=1))").unwrap(), eq("a", Value::Integer(1)));
}

#[test]
fn test_nested_groups() {
    assert_eq!(
        parse("(a=1|(b=2&c=3))&d=4").unwrap(),
        parse("and(or(eq(a,1),and(eq(b,2),eq(c,3))),eq(d,4))").unwrap()
    );
}

#[test]
fn test_tuple_key_inside_group() {
    assert_eq!(
        parse("((a,b)=1|c=2)").unwrap(),
        parse("or(eq((a,b),1),eq(c,2))").unwrap()
    );
}

// ============================================================================
// Calls and arguments
// ============================================================================

#[test]
fn test_call_arguments() {
    assert_eq!(
        parse("select(name,age)").unwrap(),
        call("select", vec!["name".into(), "age".into()])
    );
    assert_eq!(parse("count()").unwrap(), call("count", vec![]));
}

#[test]
fn test_array_arguments() {
    assert_eq!(
        parse("in(state,(FL,AL))").unwrap(),
        call(
            "in",
            vec!["state".into(), array(vec!["FL".into(), "AL".into()]).into()]
        )
    );
    assert_eq!(
        parse("eq(a,(1,(2,3)))").unwrap(),
        eq(
            "a",
            array(vec![
                Value::Integer(1),
                array(vec![Value::Integer(2), Value::Integer(3)]),
            ])
        )
    );
}

#[test]
fn test_nested_calls() {
    let parsed = parse("aggregate(state,sum(balance),count())").unwrap();
    assert_eq!(
        parsed,
        call(
            "aggregate",
            vec![
                "state".into(),
                call("sum", vec!["balance".into()]).into(),
                call("count", vec![]).into(),
            ]
        )
    );
}

#[test]
fn test_sort_keys() {
    assert_eq!(
        parse("sort(+name,-age,city)").unwrap(),
        call(
            "sort",
            vec![
                SortKey::asc("name").into(),
                SortKey::desc("age").into(),
                "city".into(),
            ]
        )
    );
}

#[test]
fn test_sort_tuple_key() {
    assert_eq!(
        parse("sort(-(a,b))").unwrap(),
        call(
            "sort",
            vec![SortKey::desc(array(vec!["a".into(), "b".into()])).into()]
        )
    );
}

#[test]
fn test_signs_outside_sort_are_numbers() {
    assert_eq!(parse("a=-5").unwrap(), eq("a", Value::Integer(-5)));
    assert_eq!(
        parse("limit(+5)").unwrap(),
        call("limit", vec![Value::Integer(5).into()])
    );
}

#[test]
fn test_unknown_names_still_parse() {
    assert_eq!(
        parse("lero(a)").unwrap(),
        call("lero", vec!["a".into()])
    );
}

#[test]
fn test_display_is_canonical() {
    assert_eq!(parse("a=1&b=lt=2").unwrap().to_string(), "and(eq(a,1),lt(b,2))");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_empty_query() {
    let err = parse("").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Empty);
    assert_eq!(err.position, 0);
}

#[test]
fn test_missing_close_paren() {
    let err = parse("eq(a,1").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unbalanced("missing ')'"));
    assert_eq!(err.position, 0);
    assert_eq!(err.fragment, "eq(a,1");
    assert_eq!(
        err.to_string(),
        "unbalanced parentheses: missing ')' at position 0 near `eq(a,1`"
    );

    let err = parse("(a=1").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unbalanced("missing ')'"));
}

#[test]
fn test_extra_close_paren() {
    let err = parse("eq(a,1))").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unbalanced("unexpected ')'"));
    assert_eq!(err.position, 7);
}

#[test]
fn test_bare_or() {
    let err = parse("a=1|b=2").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::BareOr);
    assert_eq!(err.position, 3);
}

#[test]
fn test_mixed_group() {
    let err = parse("(a=1|b=2&c=3)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::MixedGroup);
    assert_eq!(err.position, 8);
}

#[test]
fn test_empty_argument() {
    let err = parse("eq(a,)").unwrap_err();
    assert!(matches!(
        err.kind,
        ParseErrorKind::UnexpectedToken { ref expected, .. } if expected == "a value"
    ));
    assert_eq!(err.position, 5);
}

#[test]
fn test_empty_array() {
    let err = parse("in(a,())").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
}

#[test]
fn test_invalid_name() {
    let err = parse("9x(a)").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InvalidName("9x".to_string()));
}

#[test]
fn test_bare_word() {
    assert!(matches!(
        parse("foo").unwrap_err().kind,
        ParseErrorKind::UnexpectedToken { .. }
    ));
    assert!(matches!(
        parse("&a=1").unwrap_err().kind,
        ParseErrorKind::UnexpectedToken { .. }
    ));
}

#[test]
fn test_bad_literal() {
    let err = parse("eq(a,date:nope)").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Literal(_)));
    assert_eq!(err.position, 5);
    assert!(err.to_string().contains("cannot convert 'nope' to date"));

    let err = parse("eq(a,%FF)").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::Literal(_)));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_key_value_matches_eq(
        key in "[a-z][a-z0-9_]{0,8}",
        value in "[A-Za-z0-9_.]{1,10}",
    ) {
        let implicit = parse(&format!("{}={}", key, value)).unwrap();
        let explicit = parse(&format!("eq({},{})", key, value)).unwrap();
        prop_assert_eq!(implicit, explicit);
    }

    #[test]
    fn prop_clauses_keep_their_order(values in prop::collection::vec(0i64..1000, 2..6)) {
        let query = values
            .iter()
            .enumerate()
            .map(|(i, v)| format!("f{}={}", i, v))
            .collect::<Vec<_>>()
            .join("&");
        let parsed = parse(&query).unwrap();

        prop_assert_eq!(parsed.name.as_str(), "and");
        for (i, (arg, v)) in parsed.args.iter().zip(&values).enumerate() {
            let expected = eq(&format!("f{}", i), Value::Integer(*v));
            prop_assert_eq!(arg.as_call(), Some(&expected));
        }
    }
}
