//! The query engine.
//!
//! A [`Query`] owns a shared, read-only collection of records and a list of
//! compiled stages. [`Query::query`] appends stages and returns a new query,
//! [`Query::all`] runs them.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::{
    ast::{Arg, Call, Operator},
    convert::records_from_json,
    error::RqlError,
    evaluator::{EvalError, Evaluator},
    parser::parse,
    pipeline::PipelineState,
    stage::{CompileOptions, Stage, compile},
    value::{Record, Value},
};

/// Engine settings, usually chosen by the service hosting the queries.
///
/// # Examples
///
/// ```
/// use rql_lang::QueryOptions;
///
/// let options = QueryOptions::new()
///     .with_default_limit(20)
///     .with_max_limit(100)
///     .ignore_top_eq(["page"]);
/// assert_eq!(options.max_limit, Some(100));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Truncates sequence results of pipelines that have no `limit()`
    pub default_limit: Option<usize>,

    /// Upper bound for every `limit()` count
    pub max_limit: Option<usize>,

    /// Fields whose top-level `eq` clauses are dropped before compiling
    pub ignore_top_eq: Vec<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = Some(limit);
        self
    }

    pub fn with_max_limit(mut self, limit: usize) -> Self {
        self.max_limit = Some(limit);
        self
    }

    pub fn ignore_top_eq<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_top_eq.extend(fields.into_iter().map(Into::into));
        self
    }

    fn ignores(&self, clause: &Call) -> bool {
        clause.name == Operator::Eq.name()
            && matches!(
                clause.args.first(),
                Some(Arg::Value(Value::String(field))) if self.ignore_top_eq.contains(field)
            )
    }
}

/// A pipeline of stages over a collection of records.
///
/// Queries are immutable: [`Query::query`] returns a new query and leaves the
/// receiver reusable. The records are shared, never copied until evaluation.
///
/// # Examples
///
/// ```
/// use rql_lang::{PipelineState, Query, Value};
/// use serde_json::json;
///
/// let query = Query::from_json(json!([
///     {"name": "ann", "age": 31},
///     {"name": "bob", "age": 25},
/// ]))
/// .unwrap();
///
/// let result = query.apply("age=gt=30&values(name)").unwrap();
/// assert_eq!(result, PipelineState::Values(vec![Value::from("ann")]));
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    data: Arc<Vec<Record>>,
    options: QueryOptions,
    expr: String,
    clauses: Vec<Call>,
    pipeline: Vec<Stage>,
    has_limit: bool,
}

impl Query {
    pub fn new(records: Vec<Record>) -> Self {
        Self::with_options(records, QueryOptions::default())
    }

    pub fn with_options(records: Vec<Record>, options: QueryOptions) -> Self {
        Query {
            data: Arc::new(records),
            options,
            expr: String::new(),
            clauses: Vec::new(),
            pipeline: Vec::new(),
            has_limit: false,
        }
    }

    /// Builds a query over a JSON array of objects.
    pub fn from_json(json: serde_json::Value) -> Result<Self, RqlError> {
        Ok(Self::new(records_from_json(json)?))
    }

    /// Replaces the engine options, keeping records and stages.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// The expressions added so far, joined with `&`.
    pub fn expr(&self) -> &str {
        &self.expr
    }

    /// The call-tree of all clauses added so far.
    pub fn parsed(&self) -> Option<Call> {
        (!self.clauses.is_empty()).then(|| Call::conjunction(self.clauses.clone()))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.pipeline
    }

    pub fn records(&self) -> &[Record] {
        &self.data
    }

    /// Parses `expr` and returns a new query with its stages appended.
    ///
    /// An empty expression adds no stages.
    pub fn query(&self, expr: &str) -> Result<Query, RqlError> {
        if expr.trim().is_empty() {
            return Ok(self.clone());
        }

        let parsed = parse(expr)?;
        let clauses: Vec<Call> = top_level_clauses(parsed)
            .into_iter()
            .filter(|clause| !self.options.ignores(clause))
            .collect();

        let compile_options = CompileOptions {
            max_limit: self.options.max_limit,
        };

        let mut new = self.clone();
        for clause in &clauses {
            let stage = compile(clause, compile_options).map_err(|source| EvalError::Stage {
                position: new.pipeline.len(),
                operator: clause.name.clone(),
                source: Box::new(source),
            })?;
            new.has_limit |= matches!(stage, Stage::Limit { .. });
            new.pipeline.push(stage);
        }

        if new.expr.is_empty() {
            new.expr = expr.to_string();
        } else {
            new.expr = format!("{}&{}", new.expr, expr);
        }
        new.clauses.extend(clauses);

        debug!(expr, stages = new.pipeline.len(), "compiled query");
        Ok(new)
    }

    /// Runs the pipeline over a working copy of the records.
    pub fn all(&self) -> Result<PipelineState, EvalError> {
        let evaluator = Evaluator::new();
        let mut state = PipelineState::Records(self.data.as_ref().clone());

        for (position, stage) in self.pipeline.iter().enumerate() {
            state = evaluator
                .eval_stage(stage, state)
                .map_err(|source| EvalError::Stage {
                    position,
                    operator: stage.name().to_string(),
                    source: Box::new(source),
                })?;

            trace!(
                position,
                operator = stage.name(),
                kind = state.kind(),
                len = state.len(),
                "applied stage"
            );
        }

        if let Some(limit) = self.options.default_limit
            && !self.has_limit
            && state.is_sequence()
        {
            debug!(limit, len = state.len(), "applying default limit");
            let stage = Stage::Limit {
                count: Some(limit),
                start: 0,
            };
            state = evaluator.eval_stage(&stage, state)?;
        }

        Ok(state)
    }

    /// Shorthand for [`Query::query`] followed by [`Query::all`].
    pub fn apply(&self, expr: &str) -> Result<PipelineState, RqlError> {
        Ok(self.query(expr)?.all()?)
    }
}

/// Splits a top-level `and` of calls into its clauses.
fn top_level_clauses(parsed: Call) -> Vec<Call> {
    let is_flat_and = parsed.name == Operator::And.name()
        && !parsed.args.is_empty()
        && parsed.args.iter().all(|arg| matches!(arg, Arg::Call(_)));

    if !is_flat_and {
        return vec![parsed];
    }

    parsed
        .args
        .into_iter()
        .filter_map(|arg| match arg {
            Arg::Call(call) => Some(call),
            _ => None,
        })
        .collect()
}
