//! RQL serialization of call-trees.
//!
//! This module turns a parsed [`Call`] back into query text. The output is
//! canonical: every clause is written as an explicit call, so
//! `a=1&(b=2|c=3)` prints as `and(eq(a,1),or(eq(b,2),eq(c,3)))`.
//!
//! # Features
//!
//! - **Round trip** - parsing the output gives back the same call-tree
//! - **Type preservation** - floats always carry a `.` or an exponent, and
//!   strings that would otherwise resolve to another type get a `string:` tag
//! - **Escaping** - delimiters, whitespace and `%` in strings are percent-encoded
//!
//! # Examples
//!
//! ```
//! use rql_lang::parse;
//! use rql_lang::output::to_rql;
//!
//! let call = parse("name=lero%20lero&sort(-age)").unwrap();
//! assert_eq!(to_rql(&call), "and(eq(name,lero%20lero),sort(-age))");
//! ```

use std::fmt;

use chrono::SecondsFormat;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::{
    ast::{Arg, Call, SortKey},
    convert::value_to_json,
    literal::{TypeTag, auto_detect},
    value::Value,
};

/// Characters escaped inside string tokens.
const RESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'(')
    .add(b')')
    .add(b',')
    .add(b'&')
    .add(b'|')
    .add(b'=')
    .add(b'%');

pub struct RqlPrinter;

impl RqlPrinter {
    pub fn new() -> Self {
        RqlPrinter
    }

    pub fn print(&self, call: &Call) -> String {
        let mut out = String::new();
        self.print_call(call, &mut out);
        out
    }

    fn print_call(&self, call: &Call, out: &mut String) {
        out.push_str(&call.name);
        out.push('(');
        for (i, arg) in call.args.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.print_arg(arg, out);
        }
        out.push(')');
    }

    fn print_arg(&self, arg: &Arg, out: &mut String) {
        match arg {
            Arg::Call(call) => self.print_call(call, out),
            Arg::Value(value) => self.print_value(value, out),
            Arg::Sort(SortKey { dir, key }) => {
                out.push(dir.prefix());
                self.print_value(key, out);
            }
        }
    }

    pub fn print_value(&self, value: &Value, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::String(s) => self.print_string(s, out),
            Value::Decimal(d) => tagged(out, TypeTag::Decimal, &d.to_string()),
            Value::Date(d) => tagged(out, TypeTag::Date, &d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => tagged(
                out,
                TypeTag::DateTime,
                &dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            Value::Epoch(f) => {
                let text = if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", *f as i64)
                } else {
                    format_float(*f)
                };
                tagged(out, TypeTag::Epoch, &text)
            }
            Value::Uuid(u) => tagged(out, TypeTag::Uuid, &u.hyphenated().to_string()),
            Value::Array(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.print_value(item, out);
                }
                out.push(')');
            }
            // Objects never come out of the parser; keep them readable as JSON text
            Value::Object(_) => self.print_string(&value_to_json(value).to_string(), out),
        }
    }

    fn print_string(&self, s: &str, out: &mut String) {
        if needs_string_tag(s) {
            out.push_str(TypeTag::String.name());
            out.push(':');
        }

        // A leading sign would read as a sort direction
        let (sign, rest) = match s.chars().next() {
            Some(c @ ('+' | '-')) => (Some(c), &s[1..]),
            _ => (None, s),
        };
        match sign {
            Some('+') => out.push_str("%2B"),
            Some(_) => out.push_str("%2D"),
            None => {}
        }
        out.extend(utf8_percent_encode(rest, RESERVED));
    }
}

impl Default for RqlPrinter {
    fn default() -> Self {
        Self::new()
    }
}

fn tagged(out: &mut String, tag: TypeTag, text: &str) {
    out.push_str(tag.name());
    out.push(':');
    out.push_str(text);
}

/// Whether a bare string would be read back as something else.
fn needs_string_tag(s: &str) -> bool {
    if s.is_empty() || auto_detect(s) != Value::String(s.to_string()) {
        return true;
    }
    matches!(s.split_once(':'), Some((prefix, _)) if TypeTag::from_name(prefix).is_some())
}

fn format_float(f: f64) -> String {
    // Debug formatting keeps a '.' or an exponent on every finite float
    format!("{:?}", f)
}

/// Converts a call-tree to RQL text.
pub fn to_rql(call: &Call) -> String {
    RqlPrinter::new().print(call)
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_rql(self))
    }
}
