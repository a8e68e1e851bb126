use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive};
use thiserror::Error;

use crate::{
    ast::Dir,
    path::{FieldPath, resolve_index},
    pipeline::PipelineState,
    stage::{CompareOp, Operand, Predicate, ReduceFn, Reducer, SortSpec, Stage},
    value::{Record, Value, compare_values},
};

/// Errors that can occur while compiling or running a query pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Call name outside the operator table
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Wrong number of arguments
    #[error("{operator}() takes {expected} argument(s), got {found}")]
    Arity {
        operator: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// Argument of the wrong kind (not an array, negative limit, ...)
    #[error("invalid argument to {operator}(): {message}")]
    InvalidArgument {
        operator: &'static str,
        message: String,
    },

    /// A record lacks a referenced field
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Type mismatch or invalid operation for the given type
    #[error("type error: {0}")]
    TypeError(String),

    #[error("{operator}() of an empty sequence")]
    EmptySequence { operator: &'static str },

    #[error("one() expects exactly one result, found {found}")]
    NotExactlyOne { found: usize },

    #[error("index {index} out of range for {len} element(s)")]
    IndexOutOfRange { index: i64, len: usize },

    /// A stage received a pipeline state it does not accept
    #[error("{operator}() cannot be applied to {found}, expected {expected}")]
    StateMismatch {
        operator: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// Failure of one pipeline stage
    #[error("stage {position} ({operator}): {source}")]
    Stage {
        position: usize,
        operator: String,
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// The underlying error, with any stage wrappers removed.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            EvalError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Shape of a sequence state, so it can be rebuilt after reordering.
#[derive(Clone, Copy)]
enum Shape {
    Records,
    Grouped,
    Values,
}

/// Executes compiled stages.
///
/// The evaluator holds no state: every stage consumes the previous
/// [`PipelineState`] and returns a new one.
///
/// # Examples
///
/// ```
/// use rql_lang::evaluator::Evaluator;
/// use rql_lang::stage::{compile, CompileOptions};
/// use rql_lang::{parse, PipelineState, Value};
///
/// let stage = compile(&parse("sum()").unwrap(), CompileOptions::default()).unwrap();
/// let state = PipelineState::Values(vec![Value::Integer(2), Value::Integer(3)]);
///
/// let result = Evaluator::new().eval_stage(&stage, state).unwrap();
/// assert_eq!(result, PipelineState::Scalar(Value::Integer(5)));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Applies one stage to the current state.
    pub fn eval_stage(&self, stage: &Stage, state: PipelineState) -> Result<PipelineState, EvalError> {
        let operator = stage.name();

        match stage {
            Stage::Filter(predicate) => self.filter(predicate, state, operator),
            Stage::Select(fields) => self.select(fields, state),
            Stage::Values(field) => {
                let rows = records(state, operator)?;
                Ok(PipelineState::Values(extract(field, &rows)?))
            }
            Stage::Key(field) => self.key(field, state),
            Stage::Sort(specs) => self.sort(specs, state),
            Stage::Unwind(field) => self.unwind(field, state),
            Stage::Limit { count, start } => {
                let (shape, items) = sequence(state, operator)?;
                let items = items
                    .into_iter()
                    .skip(*start)
                    .take(count.unwrap_or(usize::MAX))
                    .collect();
                Ok(rebuild(shape, items))
            }
            Stage::Slice { start, stop, step } => {
                let (shape, items) = sequence(state, operator)?;
                Ok(rebuild(shape, slice(items, *start, *stop, *step)))
            }
            Stage::Distinct => {
                let (shape, items) = sequence(state, operator)?;
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items {
                    if !unique.iter().any(|seen| seen.loose_eq(&item)) {
                        unique.push(item);
                    }
                }
                Ok(rebuild(shape, unique))
            }
            Stage::First => {
                let (_, items) = sequence(state, operator)?;
                items
                    .into_iter()
                    .next()
                    .map(PipelineState::Scalar)
                    .ok_or(EvalError::EmptySequence { operator: "first" })
            }
            Stage::One => {
                let (_, mut items) = sequence(state, operator)?;
                if items.len() != 1 {
                    return Err(EvalError::NotExactlyOne { found: items.len() });
                }
                Ok(PipelineState::Scalar(items.remove(0)))
            }
            Stage::Index(index) => {
                let (_, mut items) = sequence(state, operator)?;
                let len = items.len();
                let position = resolve_index(*index, len).ok_or(EvalError::IndexOutOfRange {
                    index: *index,
                    len,
                })?;
                Ok(PipelineState::Scalar(items.swap_remove(position)))
            }
            Stage::Reduce(reducer) => self.reduce_state(reducer, state),
            Stage::Aggregate { key, reducers } => {
                let rows = records(state, operator)?;
                self.aggregate(key, reducers, rows).map(PipelineState::Grouped)
            }
        }
    }

    /// Tests a predicate against one record.
    pub fn matches(&self, predicate: &Predicate, row: &Record) -> Result<bool, EvalError> {
        match predicate {
            Predicate::Compare { op, field, operand } => {
                let left = field.lookup(row)?;
                let right = match operand {
                    Operand::Literal(value) => value,
                    Operand::Field(other) => other.lookup(row)?,
                };
                compare(*op, left, right)
            }
            Predicate::Member {
                negated,
                field,
                set,
            } => {
                let value = field.lookup(row)?;
                let found = set.iter().any(|item| item.loose_eq(value));
                Ok(found != *negated)
            }
            Predicate::Contains {
                negated,
                field,
                needle,
            } => {
                let haystack = field.lookup(row)?;
                let found = match (haystack, needle) {
                    (Value::Array(items), needle) => items.iter().any(|item| item.loose_eq(needle)),
                    (Value::String(text), Value::String(part)) => text.contains(part.as_str()),
                    (other, _) => {
                        return Err(EvalError::TypeError(format!(
                            "{}() requires an array or string field, '{}' is {}",
                            predicate.name(),
                            field,
                            other.type_name()
                        )));
                    }
                };
                Ok(found != *negated)
            }
            Predicate::And(predicates) => {
                for predicate in predicates {
                    if !self.matches(predicate, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(predicates) => {
                for predicate in predicates {
                    if self.matches(predicate, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn filter(
        &self,
        predicate: &Predicate,
        state: PipelineState,
        operator: &'static str,
    ) -> Result<PipelineState, EvalError> {
        let keep = |rows: Vec<Record>| -> Result<Vec<Record>, EvalError> {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if self.matches(predicate, &row)? {
                    kept.push(row);
                }
            }
            Ok(kept)
        };

        match state {
            PipelineState::Records(rows) => keep(rows).map(PipelineState::Records),
            PipelineState::Grouped(rows) => keep(rows).map(PipelineState::Grouped),
            other => Err(mismatch(operator, "records", &other)),
        }
    }

    fn select(&self, fields: &[FieldPath], state: PipelineState) -> Result<PipelineState, EvalError> {
        let project = |row: &Record| -> Result<Record, EvalError> {
            fields
                .iter()
                .map(|field| Ok((field.name().to_string(), field.lookup(row)?.clone())))
                .collect()
        };

        match state {
            PipelineState::Records(rows) => rows
                .iter()
                .map(project)
                .collect::<Result<_, _>>()
                .map(PipelineState::Records),
            PipelineState::Grouped(rows) => rows
                .iter()
                .map(project)
                .collect::<Result<_, _>>()
                .map(PipelineState::Grouped),
            PipelineState::Scalar(Value::Object(row)) => {
                Ok(PipelineState::Scalar(Value::Object(project(&row)?)))
            }
            other => Err(mismatch("select", "records", &other)),
        }
    }

    fn key(&self, field: &FieldPath, state: PipelineState) -> Result<PipelineState, EvalError> {
        match state {
            PipelineState::Scalar(Value::Object(row)) => {
                Ok(PipelineState::Scalar(field.lookup(&row)?.clone()))
            }
            PipelineState::Records(rows) | PipelineState::Grouped(rows) => {
                Ok(PipelineState::Values(extract(field, &rows)?))
            }
            other => Err(mismatch("key", "records or a single record", &other)),
        }
    }

    fn sort(&self, specs: &[SortSpec], state: PipelineState) -> Result<PipelineState, EvalError> {
        match state {
            PipelineState::Values(values) if specs.is_empty() => {
                let keyed = values.into_iter().map(|v| (vec![v.clone()], v)).collect();
                let asc = [Dir::Asc];
                sort_keyed(keyed, &asc).map(PipelineState::Values)
            }
            PipelineState::Records(rows) if !specs.is_empty() => {
                sort_records(specs, rows).map(PipelineState::Records)
            }
            PipelineState::Grouped(rows) if !specs.is_empty() => {
                sort_records(specs, rows).map(PipelineState::Grouped)
            }
            other if specs.is_empty() => Err(mismatch("sort", "values", &other)),
            other => Err(mismatch("sort", "records", &other)),
        }
    }

    fn unwind(&self, field: &FieldPath, state: PipelineState) -> Result<PipelineState, EvalError> {
        let rows = records(state, "unwind")?;
        let mut unwound = Vec::with_capacity(rows.len());

        for row in &rows {
            let items = match field.lookup(row)? {
                Value::Array(items) => items,
                other => {
                    return Err(EvalError::TypeError(format!(
                        "unwind() requires an array field, '{}' is {}",
                        field,
                        other.type_name()
                    )));
                }
            };
            for item in items {
                unwound.push(field.assign(row, item.clone())?);
            }
        }

        Ok(PipelineState::Records(unwound))
    }

    fn reduce_state(&self, reducer: &Reducer, state: PipelineState) -> Result<PipelineState, EvalError> {
        let operator = reducer.func.name();

        let values = match (state, &reducer.field) {
            (PipelineState::Values(values), None) => values,
            (PipelineState::Records(rows) | PipelineState::Grouped(rows), _)
                if reducer.func == ReduceFn::Count =>
            {
                return Ok(PipelineState::Scalar(count(rows.len())));
            }
            (PipelineState::Records(rows) | PipelineState::Grouped(rows), Some(field)) => {
                extract(field, &rows)?
            }
            (PipelineState::Records(_) | PipelineState::Grouped(_), None) => {
                return Err(EvalError::Arity {
                    operator,
                    expected: "exactly 1",
                    found: 0,
                });
            }
            (PipelineState::Values(_), Some(field)) => {
                return Err(EvalError::InvalidArgument {
                    operator,
                    message: format!("field '{}' cannot be read from bare values", field),
                });
            }
            (other, _) => return Err(mismatch(operator, "records or values", &other)),
        };

        reduce(reducer.func, &values).map(PipelineState::Scalar)
    }

    fn aggregate(
        &self,
        key: &FieldPath,
        reducers: &[Reducer],
        rows: Vec<Record>,
    ) -> Result<Vec<Record>, EvalError> {
        let mut groups: Vec<(Value, Vec<Record>)> = Vec::new();

        for row in rows {
            let group = key.lookup(&row)?.clone();
            match groups.iter_mut().find(|(seen, _)| seen.loose_eq(&group)) {
                Some((_, members)) => members.push(row),
                None => groups.push((group, vec![row])),
            }
        }

        groups
            .into_iter()
            .map(|(group, members)| {
                let mut output = Record::new();
                output.insert(key.name().to_string(), group);
                for reducer in reducers {
                    let result = match &reducer.field {
                        Some(field) => reduce(reducer.func, &extract(field, &members)?)?,
                        None => count(members.len()),
                    };
                    output.insert(reducer.func.name().to_string(), result);
                }
                Ok(output)
            })
            .collect()
    }
}

fn mismatch(operator: &'static str, expected: &'static str, found: &PipelineState) -> EvalError {
    EvalError::StateMismatch {
        operator,
        expected,
        found: found.kind(),
    }
}

fn records(state: PipelineState, operator: &'static str) -> Result<Vec<Record>, EvalError> {
    match state {
        PipelineState::Records(rows) | PipelineState::Grouped(rows) => Ok(rows),
        other => Err(mismatch(operator, "records", &other)),
    }
}

fn sequence(state: PipelineState, operator: &'static str) -> Result<(Shape, Vec<Value>), EvalError> {
    match state {
        PipelineState::Records(rows) => Ok((Shape::Records, rows.into_iter().map(Value::Object).collect())),
        PipelineState::Grouped(rows) => Ok((Shape::Grouped, rows.into_iter().map(Value::Object).collect())),
        PipelineState::Values(values) => Ok((Shape::Values, values)),
        other => Err(mismatch(operator, "a sequence", &other)),
    }
}

fn rebuild(shape: Shape, items: Vec<Value>) -> PipelineState {
    let unwrap_records = |items: Vec<Value>| -> Vec<Record> {
        items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect()
    };

    match shape {
        Shape::Records => PipelineState::Records(unwrap_records(items)),
        Shape::Grouped => PipelineState::Grouped(unwrap_records(items)),
        Shape::Values => PipelineState::Values(items),
    }
}

fn extract(field: &FieldPath, rows: &[Record]) -> Result<Vec<Value>, EvalError> {
    rows.iter().map(|row| field.lookup(row).cloned()).collect()
}

fn count(len: usize) -> Value {
    Value::Integer(i64::try_from(len).unwrap_or(i64::MAX))
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    let ordering = || {
        compare_values(left, right).ok_or_else(|| {
            EvalError::TypeError(format!(
                "cannot compare {} with {} in {}()",
                left.type_name(),
                right.type_name(),
                op.name()
            ))
        })
    };

    Ok(match op {
        CompareOp::Eq => left.loose_eq(right),
        CompareOp::Ne => !left.loose_eq(right),
        CompareOp::Lt => ordering()? == Ordering::Less,
        CompareOp::Le => ordering()? != Ordering::Greater,
        CompareOp::Gt => ordering()? == Ordering::Greater,
        CompareOp::Ge => ordering()? != Ordering::Less,
    })
}

/// Python-style slice with a positive step.
fn slice(items: Vec<Value>, start: Option<i64>, stop: Option<i64>, step: usize) -> Vec<Value> {
    let len = items.len();
    let clamp = |bound: Option<i64>, default: usize| -> usize {
        match bound {
            None => default,
            Some(n) if n < 0 => len.saturating_sub(n.unsigned_abs() as usize),
            Some(n) => (n as usize).min(len),
        }
    };

    let start = clamp(start, 0);
    let stop = clamp(stop, len);
    if start >= stop {
        return Vec::new();
    }

    items
        .into_iter()
        .skip(start)
        .take(stop - start)
        .step_by(step)
        .collect()
}

fn sort_records(specs: &[SortSpec], rows: Vec<Record>) -> Result<Vec<Record>, EvalError> {
    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let keys = specs
            .iter()
            .map(|spec| spec.field.lookup(&row).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        keyed.push((keys, row));
    }

    let dirs: Vec<Dir> = specs.iter().map(|spec| spec.dir).collect();
    sort_keyed(keyed, &dirs)
}

/// Stable sort on precomputed keys; the first incomparable pair is an error.
fn sort_keyed<T>(mut keyed: Vec<(Vec<Value>, T)>, dirs: &[Dir]) -> Result<Vec<T>, EvalError> {
    let mut failure = None;

    keyed.sort_by(|(a, _), (b, _)| {
        for ((x, y), dir) in a.iter().zip(b).zip(dirs) {
            match compare_values(x, y) {
                Some(Ordering::Equal) => continue,
                Some(ordering) => return dir.apply(ordering),
                None => {
                    failure.get_or_insert_with(|| {
                        EvalError::TypeError(format!(
                            "cannot sort {} against {}",
                            x.type_name(),
                            y.type_name()
                        ))
                    });
                    return Ordering::Equal;
                }
            }
        }
        Ordering::Equal
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(keyed.into_iter().map(|(_, item)| item).collect()),
    }
}

/// Reduces a list of values with one aggregate function.
pub fn reduce(func: ReduceFn, values: &[Value]) -> Result<Value, EvalError> {
    match func {
        ReduceFn::Count => Ok(count(values.len())),
        ReduceFn::Sum => sum(values),
        ReduceFn::Mean => mean(values),
        ReduceFn::Min => extreme(values, "min", Ordering::Less),
        ReduceFn::Max => extreme(values, "max", Ordering::Greater),
    }
}

fn sum(values: &[Value]) -> Result<Value, EvalError> {
    let mut total = Value::Integer(0);
    for value in values {
        total = add(total, value)?;
    }
    Ok(total)
}

fn add(total: Value, value: &Value) -> Result<Value, EvalError> {
    if !value.is_numeric() {
        return Err(EvalError::TypeError(format!(
            "sum() requires numeric values, got {}",
            value.type_name()
        )));
    }

    match (&total, value) {
        (Value::Integer(a), Value::Integer(b)) => Ok(match a.checked_add(*b) {
            Some(n) => Value::Integer(n),
            None => Value::Float(*a as f64 + *b as f64),
        }),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            let a = to_decimal(&total)?;
            let b = to_decimal(value)?;
            a.checked_add(b)
                .map(Value::Decimal)
                .ok_or_else(|| EvalError::TypeError("decimal overflow in sum()".to_string()))
        }
        _ => match (total.as_float(), value.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(EvalError::TypeError(format!(
                "sum() requires numeric values, got {}",
                value.type_name()
            ))),
        },
    }
}

fn to_decimal(value: &Value) -> Result<Decimal, EvalError> {
    let converted = match value {
        Value::Decimal(d) => Some(*d),
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Float(f) => Decimal::from_f64(*f),
        _ => None,
    };
    converted.ok_or_else(|| {
        EvalError::TypeError(format!("cannot use {} as a decimal", value.type_name()))
    })
}

fn mean(values: &[Value]) -> Result<Value, EvalError> {
    if values.is_empty() {
        return Err(EvalError::EmptySequence { operator: "mean" });
    }

    let len = values.len();
    match sum(values)? {
        Value::Integer(total) => match i64::try_from(len) {
            Ok(n) if total % n == 0 => Ok(Value::Integer(total / n)),
            _ => Ok(Value::Float(total as f64 / len as f64)),
        },
        Value::Decimal(total) => total
            .checked_div(Decimal::from(len))
            .map(Value::Decimal)
            .ok_or_else(|| EvalError::TypeError("decimal overflow in mean()".to_string())),
        other => match other.as_float() {
            Some(total) => Ok(Value::Float(total / len as f64)),
            None => Err(EvalError::TypeError(format!(
                "mean() requires numeric values, got {}",
                other.type_name()
            ))),
        },
    }
}

/// Smallest or largest value; the first of equal values wins.
fn extreme(values: &[Value], operator: &'static str, wanted: Ordering) -> Result<Value, EvalError> {
    let (first, rest) = values
        .split_first()
        .ok_or(EvalError::EmptySequence { operator })?;

    let mut best = first;
    for value in rest {
        let ordering = compare_values(value, best).ok_or_else(|| {
            EvalError::TypeError(format!(
                "{}() cannot compare {} with {}",
                operator,
                value.type_name(),
                best.type_name()
            ))
        })?;
        if ordering == wanted {
            best = value;
        }
    }

    Ok(best.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn integer_sum_falls_back_to_float() {
        let values = vec![Value::Integer(i64::MAX), Value::Integer(1)];
        assert!(matches!(sum(&values).unwrap(), Value::Float(_)));
    }

    #[test]
    fn decimal_sum_is_exact() {
        let values = vec![
            Value::Decimal(Decimal::from_str("0.1").unwrap()),
            Value::Decimal(Decimal::from_str("0.2").unwrap()),
            Value::Integer(1),
        ];
        assert_eq!(
            sum(&values).unwrap(),
            Value::Decimal(Decimal::from_str("1.3").unwrap())
        );
    }

    #[test]
    fn mean_keeps_integers_when_exact() {
        let exact = vec![Value::Integer(2), Value::Integer(4)];
        assert_eq!(mean(&exact).unwrap(), Value::Integer(3));

        let inexact = vec![Value::Integer(1), Value::Integer(2)];
        assert_eq!(mean(&inexact).unwrap(), Value::Float(1.5));

        assert_eq!(
            mean(&[]),
            Err(EvalError::EmptySequence { operator: "mean" })
        );
    }

    #[test]
    fn sum_rejects_strings() {
        let values = vec![Value::Integer(1), Value::from("2")];
        assert!(matches!(sum(&values), Err(EvalError::TypeError(_))));
    }

    #[test]
    fn slice_like_python() {
        let items: Vec<Value> = (0..6).map(Value::Integer).collect();
        let ints = |v: Vec<Value>| v.iter().filter_map(Value::as_int).collect::<Vec<_>>();

        assert_eq!(ints(slice(items.clone(), Some(1), Some(5), 2)), vec![1, 3]);
        assert_eq!(ints(slice(items.clone(), Some(-2), None, 1)), vec![4, 5]);
        assert_eq!(ints(slice(items.clone(), None, Some(-4), 1)), vec![0, 1]);
        assert!(slice(items, Some(4), Some(2), 1).is_empty());
    }

    #[test]
    fn root_cause_unwraps_stages() {
        let error = EvalError::Stage {
            position: 2,
            operator: "one".to_string(),
            source: Box::new(EvalError::NotExactlyOne { found: 0 }),
        };
        assert_eq!(error.root_cause(), &EvalError::NotExactlyOne { found: 0 });
        assert_eq!(
            error.to_string(),
            "stage 2 (one): one() expects exactly one result, found 0"
        );
    }
}
