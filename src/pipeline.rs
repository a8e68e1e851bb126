use crate::{
    convert::{record_to_json, value_to_json},
    value::{Record, Value},
};

/// The data threaded from one stage to the next.
///
/// Every stage declares which of these shapes it accepts; see
/// [`crate::evaluator::Evaluator::eval_stage`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    /// Records, as given or after filters and record transforms
    Records(Vec<Record>),

    /// One record per partition, produced by `aggregate()`
    Grouped(Vec<Record>),

    /// Bare values, produced by `values()` and `key()`
    Values(Vec<Value>),

    /// A single result, produced by reducers and `first()`/`one()`/`index()`
    Scalar(Value),
}

impl PipelineState {
    /// Short name of the shape, used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineState::Records(_) => "records",
            PipelineState::Grouped(_) => "grouped records",
            PipelineState::Values(_) => "values",
            PipelineState::Scalar(_) => "scalar",
        }
    }

    /// Number of elements; a scalar counts as one.
    pub fn len(&self) -> usize {
        match self {
            PipelineState::Records(rows) | PipelineState::Grouped(rows) => rows.len(),
            PipelineState::Values(values) => values.len(),
            PipelineState::Scalar(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sequence(&self) -> bool {
        !matches!(self, PipelineState::Scalar(_))
    }

    /// Collapses the state into a single value.
    ///
    /// Sequences become arrays, records become objects.
    pub fn into_value(self) -> Value {
        match self {
            PipelineState::Records(rows) | PipelineState::Grouped(rows) => {
                Value::Array(rows.into_iter().map(Value::Object).collect())
            }
            PipelineState::Values(values) => Value::Array(values),
            PipelineState::Scalar(value) => value,
        }
    }

    /// Renders the state as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PipelineState::Records(rows) | PipelineState::Grouped(rows) => {
                serde_json::Value::Array(rows.iter().map(record_to_json).collect())
            }
            PipelineState::Values(values) => {
                serde_json::Value::Array(values.iter().map(value_to_json).collect())
            }
            PipelineState::Scalar(value) => value_to_json(value),
        }
    }
}
