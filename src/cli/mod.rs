//! CLI support for rql-lang
//!
//! Provides programmatic access to the rql CLI functionality for embedding
//! in other tools.

mod check;
mod syntax;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use syntax::{execute_normalize, execute_parse};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    /// Syntax or evaluation error
    #[error(transparent)]
    Rql(#[from] crate::RqlError),

    /// JSON parsing error
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("no input provided, use --input or pipe JSON to stdin")]
    NoInput,
}

impl From<crate::ParseError> for CliError {
    fn from(e: crate::ParseError) -> Self {
        CliError::Rql(e.into())
    }
}

impl From<crate::EvalError> for CliError {
    fn from(e: crate::EvalError) -> Self {
        CliError::Rql(e.into())
    }
}
