use std::cmp::Ordering;

use crate::value::Value;

/// An operator invocation: `name(arg,arg,...)`.
///
/// Both explicit calls and the implicit forms (`key=value`, `a&b`, `(a|b)`)
/// parse into this node.
///
/// # Examples
///
/// ```
/// use rql_lang::{parse, Call, Value};
///
/// let call = parse("ten=10").unwrap();
/// assert_eq!(call, Call::new("eq", vec!["ten".into(), Value::Integer(10).into()]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Operator name, e.g. `eq`, `sort`, `aggregate`
    pub name: String,

    /// Ordered arguments
    pub args: Vec<Arg>,
}

impl Call {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Call {
            name: name.into(),
            args,
        }
    }

    /// Wraps clauses in an `and` call, or returns the clause itself when
    /// there is only one.
    pub fn conjunction(mut clauses: Vec<Call>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Call::new("and", clauses.into_iter().map(Arg::Call).collect())
        }
    }

    /// Wraps clauses in an `or` call, or returns the clause itself when
    /// there is only one.
    pub fn disjunction(mut clauses: Vec<Call>) -> Self {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Call::new("or", clauses.into_iter().map(Arg::Call).collect())
        }
    }
}

/// Argument of a [`Call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Nested operator call
    ///
    /// # Example
    /// ```text
    /// and(eq(a,1),eq(b,2))
    /// ```
    Call(Call),

    /// Literal value or bare field name (a [`Value::String`])
    ///
    /// # Example
    /// ```text
    /// eq(name,(a,b))
    /// ```
    Value(Value),

    /// Sort key with an explicit direction prefix, only inside `sort(...)`
    ///
    /// # Example
    /// ```text
    /// sort(+name,-created)
    /// ```
    Sort(SortKey),
}

impl Arg {
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Arg::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Call(_) => "call",
            Arg::Value(value) => value.type_name(),
            Arg::Sort(_) => "sort key",
        }
    }
}

impl From<Call> for Arg {
    fn from(call: Call) -> Self {
        Arg::Call(call)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Value(Value::from(s))
    }
}

impl From<SortKey> for Arg {
    fn from(key: SortKey) -> Self {
        Arg::Sort(key)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Applies this direction to an ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// The prefix character written before a sort key.
    pub fn prefix(self) -> char {
        match self {
            Dir::Asc => '+',
            Dir::Desc => '-',
        }
    }
}

/// A field reference with an explicit sort direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub dir: Dir,
    pub key: Value,
}

impl SortKey {
    pub fn asc(key: impl Into<Value>) -> Self {
        SortKey {
            dir: Dir::Asc,
            key: key.into(),
        }
    }

    pub fn desc(key: impl Into<Value>) -> Self {
        SortKey {
            dir: Dir::Desc,
            key: key.into(),
        }
    }
}
