use thiserror::Error;

use crate::{evaluator::EvalError, parser::ParseError};

/// Any failure of [`crate::Query::query`] or [`crate::Query::apply`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RqlError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),

    #[error("query error: {0}")]
    Query(#[from] EvalError),
}

impl RqlError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, RqlError::Syntax(_))
    }
}
