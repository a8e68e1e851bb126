//! Compilation of call-trees into typed pipeline stages.
//!
//! Every operator name is resolved once, here, through
//! [`Operator::from_name`]. Arity and argument types are validated before
//! any record is touched, so a compiled [`Stage`] can always be executed
//! without re-checking its shape.

use crate::{
    ast::{Arg, Call, Dir, Operator},
    evaluator::EvalError,
    path::FieldPath,
    value::Value,
};

/// Comparison operators usable in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal from the query
    Literal(Value),
    /// Another field of the same record (`key(field)`)
    Field(FieldPath),
}

/// Boolean test over a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        field: FieldPath,
        operand: Operand,
    },
    /// `in` / `out`
    Member {
        negated: bool,
        field: FieldPath,
        set: Vec<Value>,
    },
    /// `contains` / `excludes`
    Contains {
        negated: bool,
        field: FieldPath,
        needle: Value,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Reducing functions shared by simple aggregates and `aggregate()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceFn {
    Sum,
    Mean,
    Max,
    Min,
    Count,
}

impl ReduceFn {
    pub fn name(self) -> &'static str {
        match self {
            ReduceFn::Sum => "sum",
            ReduceFn::Mean => "mean",
            ReduceFn::Max => "max",
            ReduceFn::Min => "min",
            ReduceFn::Count => "count",
        }
    }
}

/// A reducer with the field it reads, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Reducer {
    pub func: ReduceFn,
    pub field: Option<FieldPath>,
}

/// One sort key of `sort(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: FieldPath,
    pub dir: Dir,
}

/// A compiled top-level operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Filter(Predicate),
    Select(Vec<FieldPath>),
    Values(FieldPath),
    /// Empty keys sort a value sequence by the values themselves
    Sort(Vec<SortSpec>),
    Limit {
        count: Option<usize>,
        start: usize,
    },
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: usize,
    },
    Index(i64),
    Distinct,
    First,
    One,
    Unwind(FieldPath),
    Key(FieldPath),
    Reduce(Reducer),
    Aggregate {
        key: FieldPath,
        reducers: Vec<Reducer>,
    },
}

impl Stage {
    /// Operator name, for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Filter(predicate) => predicate.name(),
            Stage::Select(_) => "select",
            Stage::Values(_) => "values",
            Stage::Sort(_) => "sort",
            Stage::Limit { .. } => "limit",
            Stage::Slice { .. } => "slice",
            Stage::Index(_) => "index",
            Stage::Distinct => "distinct",
            Stage::First => "first",
            Stage::One => "one",
            Stage::Unwind(_) => "unwind",
            Stage::Key(_) => "key",
            Stage::Reduce(reducer) => reducer.func.name(),
            Stage::Aggregate { .. } => "aggregate",
        }
    }
}

impl Predicate {
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::Compare { op, .. } => op.name(),
            Predicate::Member { negated: false, .. } => "in",
            Predicate::Member { negated: true, .. } => "out",
            Predicate::Contains { negated: false, .. } => "contains",
            Predicate::Contains { negated: true, .. } => "excludes",
            Predicate::And(_) => "and",
            Predicate::Or(_) => "or",
        }
    }
}

/// Caps applied while compiling `limit()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub max_limit: Option<usize>,
}

/// Compiles one top-level call into a stage.
pub fn compile(call: &Call, options: CompileOptions) -> Result<Stage, EvalError> {
    let op = operator(call)?;

    if op.is_filter() {
        return compile_predicate(call).map(Stage::Filter);
    }

    let args = &call.args;
    match op {
        Operator::Select => {
            expect_arity(op, args, 1, usize::MAX, "at least 1")?;
            args.iter()
                .map(|arg| field_arg(op, arg))
                .collect::<Result<_, _>>()
                .map(Stage::Select)
        }
        Operator::Values => {
            expect_arity(op, args, 1, 1, "exactly 1")?;
            field_arg(op, &args[0]).map(Stage::Values)
        }
        Operator::Unwind => {
            expect_arity(op, args, 1, 1, "exactly 1")?;
            field_arg(op, &args[0]).map(Stage::Unwind)
        }
        Operator::Key => {
            expect_arity(op, args, 1, 1, "exactly 1")?;
            field_arg(op, &args[0]).map(Stage::Key)
        }
        Operator::Sort => args
            .iter()
            .map(|arg| sort_arg(op, arg))
            .collect::<Result<_, _>>()
            .map(Stage::Sort),
        Operator::Limit => compile_limit(op, args, options),
        Operator::Slice => compile_slice(op, args),
        Operator::Index => {
            expect_arity(op, args, 1, 1, "exactly 1")?;
            match int_arg(op, &args[0])? {
                Some(n) => Ok(Stage::Index(n)),
                None => Err(invalid(op, "index must be an integer, got null")),
            }
        }
        Operator::Distinct => no_args(op, args, Stage::Distinct),
        Operator::First => no_args(op, args, Stage::First),
        Operator::One => no_args(op, args, Stage::One),
        Operator::Sum | Operator::Mean | Operator::Max | Operator::Min | Operator::Count => {
            compile_reducer(op, args).map(Stage::Reduce)
        }
        Operator::Aggregate => compile_aggregate(op, args),
        _ => compile_predicate(call).map(Stage::Filter),
    }
}

fn operator(call: &Call) -> Result<Operator, EvalError> {
    Operator::from_name(&call.name).ok_or_else(|| EvalError::UnknownOperator(call.name.clone()))
}

fn invalid(op: Operator, message: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        operator: op.name(),
        message: message.into(),
    }
}

fn expect_arity(
    op: Operator,
    args: &[Arg],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        return Err(EvalError::Arity {
            operator: op.name(),
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn no_args(op: Operator, args: &[Arg], stage: Stage) -> Result<Stage, EvalError> {
    expect_arity(op, args, 0, 0, "no")?;
    Ok(stage)
}

fn field_arg(op: Operator, arg: &Arg) -> Result<FieldPath, EvalError> {
    match arg {
        Arg::Value(value) => FieldPath::from_value(value),
        other => Err(invalid(
            op,
            format!("expected a field name, got {}", other.kind()),
        )),
    }
}

fn int_arg(op: Operator, arg: &Arg) -> Result<Option<i64>, EvalError> {
    match arg {
        Arg::Value(Value::Null) => Ok(None),
        Arg::Value(Value::Integer(n)) => Ok(Some(*n)),
        other => Err(invalid(
            op,
            format!("expected an integer, got {}", other.kind()),
        )),
    }
}

fn non_negative(op: Operator, value: Option<i64>) -> Result<Option<usize>, EvalError> {
    match value {
        Some(n) if n < 0 => Err(invalid(op, format!("{} must not be negative", n))),
        Some(n) => Ok(Some(n as usize)),
        None => Ok(None),
    }
}

fn sort_arg(op: Operator, arg: &Arg) -> Result<SortSpec, EvalError> {
    match arg {
        Arg::Sort(key) => Ok(SortSpec {
            field: FieldPath::from_value(&key.key)?,
            dir: key.dir,
        }),
        other => Ok(SortSpec {
            field: field_arg(op, other)?,
            dir: Dir::Asc,
        }),
    }
}

fn compile_limit(op: Operator, args: &[Arg], options: CompileOptions) -> Result<Stage, EvalError> {
    expect_arity(op, args, 1, 2, "1 or 2")?;

    let count = non_negative(op, int_arg(op, &args[0])?)?;
    let start = match args.get(1) {
        Some(arg) => non_negative(op, int_arg(op, arg)?)?.unwrap_or(0),
        None => 0,
    };

    let count = match (count, options.max_limit) {
        (Some(count), Some(max)) => Some(count.min(max)),
        (None, max) => max,
        (count, None) => count,
    };

    Ok(Stage::Limit { count, start })
}

fn compile_slice(op: Operator, args: &[Arg]) -> Result<Stage, EvalError> {
    expect_arity(op, args, 0, 3, "at most 3")?;

    let bound = |index: usize| -> Result<Option<i64>, EvalError> {
        args.get(index).map(|a| int_arg(op, a)).transpose().map(Option::flatten)
    };

    // a single argument is the stop, as in slice(stop)
    let (start, stop) = match args.len() {
        1 => (None, bound(0)?),
        _ => (bound(0)?, bound(1)?),
    };
    let step = match bound(2)? {
        None => 1,
        Some(step) if step > 0 => step as usize,
        Some(step) => return Err(invalid(op, format!("step must be positive, got {}", step))),
    };

    Ok(Stage::Slice { start, stop, step })
}

fn compile_reducer(op: Operator, args: &[Arg]) -> Result<Reducer, EvalError> {
    let func = match op {
        Operator::Sum => ReduceFn::Sum,
        Operator::Mean => ReduceFn::Mean,
        Operator::Max => ReduceFn::Max,
        Operator::Min => ReduceFn::Min,
        Operator::Count => ReduceFn::Count,
        other => return Err(invalid(other, "not an aggregate function")),
    };

    expect_arity(op, args, 0, 1, "at most 1")?;

    // count() ignores its field
    let field = match (func, args.first()) {
        (ReduceFn::Count, _) | (_, None) => None,
        (_, Some(arg)) => Some(field_arg(op, arg)?),
    };

    Ok(Reducer { func, field })
}

fn compile_aggregate(op: Operator, args: &[Arg]) -> Result<Stage, EvalError> {
    expect_arity(op, args, 2, usize::MAX, "at least 2")?;

    let key = field_arg(op, &args[0])?;
    let mut reducers: Vec<Reducer> = Vec::new();

    for arg in &args[1..] {
        let call = arg.as_call().ok_or_else(|| {
            invalid(op, format!("expected an aggregate call, got {}", arg.kind()))
        })?;

        let inner = operator(call)?;
        if !inner.is_reducer() {
            return Err(invalid(
                op,
                format!("'{}' is not an aggregate function", call.name),
            ));
        }

        let reducer = compile_reducer(inner, &call.args)?;
        if reducer.func != ReduceFn::Count && reducer.field.is_none() {
            return Err(EvalError::Arity {
                operator: inner.name(),
                expected: "exactly 1 inside aggregate()",
                found: 0,
            });
        }
        if reducers.iter().any(|r| r.func == reducer.func) {
            return Err(invalid(
                op,
                format!("duplicate '{}' aggregate", reducer.func.name()),
            ));
        }
        reducers.push(reducer);
    }

    Ok(Stage::Aggregate { key, reducers })
}

/// Compiles a filter call (and the nested calls of `and`/`or`) into a predicate.
pub fn compile_predicate(call: &Call) -> Result<Predicate, EvalError> {
    let op = operator(call)?;
    let args = &call.args;

    let compare = |cmp: CompareOp| -> Result<Predicate, EvalError> {
        expect_arity(op, args, 2, 2, "exactly 2")?;
        Ok(Predicate::Compare {
            op: cmp,
            field: field_arg(op, &args[0])?,
            operand: operand_arg(op, &args[1])?,
        })
    };

    match op {
        Operator::Eq => compare(CompareOp::Eq),
        Operator::Ne => compare(CompareOp::Ne),
        Operator::Lt => compare(CompareOp::Lt),
        Operator::Le => compare(CompareOp::Le),
        Operator::Gt => compare(CompareOp::Gt),
        Operator::Ge => compare(CompareOp::Ge),
        Operator::In | Operator::Out => {
            expect_arity(op, args, 2, 2, "exactly 2")?;
            let set = match &args[1] {
                Arg::Value(Value::Array(items)) => items.clone(),
                other => {
                    return Err(invalid(
                        op,
                        format!("expected an array, got {}", other.kind()),
                    ));
                }
            };
            Ok(Predicate::Member {
                negated: op == Operator::Out,
                field: field_arg(op, &args[0])?,
                set,
            })
        }
        Operator::Contains | Operator::Excludes => {
            expect_arity(op, args, 2, 2, "exactly 2")?;
            let needle = match &args[1] {
                Arg::Value(value) => value.clone(),
                other => {
                    return Err(invalid(
                        op,
                        format!("expected a value, got {}", other.kind()),
                    ));
                }
            };
            Ok(Predicate::Contains {
                negated: op == Operator::Excludes,
                field: field_arg(op, &args[0])?,
                needle,
            })
        }
        Operator::And | Operator::Or => {
            expect_arity(op, args, 1, usize::MAX, "at least 1")?;
            let predicates = args
                .iter()
                .map(|arg| match arg {
                    Arg::Call(nested) => compile_predicate(nested),
                    other => Err(invalid(
                        op,
                        format!("expected a filter call, got {}", other.kind()),
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(if op == Operator::And {
                Predicate::And(predicates)
            } else {
                Predicate::Or(predicates)
            })
        }
        other => Err(invalid(
            other,
            "cannot be used as a filter condition",
        )),
    }
}

fn operand_arg(op: Operator, arg: &Arg) -> Result<Operand, EvalError> {
    match arg {
        Arg::Value(value) => Ok(Operand::Literal(value.clone())),
        Arg::Call(call) if call.name == Operator::Key.name() => {
            expect_arity(Operator::Key, &call.args, 1, 1, "exactly 1")?;
            field_arg(Operator::Key, &call.args[0]).map(Operand::Field)
        }
        other => Err(invalid(
            op,
            format!("expected a value or key(field), got {}", other.kind()),
        )),
    }
}
