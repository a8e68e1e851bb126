//! Execute RQL queries against JSON input

use super::CliError;
use crate::{Query, QueryOptions, parse};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The RQL query to execute
    pub query: String,
    /// JSON input string, an array of objects
    pub input: Option<String>,
    /// Only validate syntax, don't execute
    pub syntax_only: bool,
    /// Engine settings
    pub engine: QueryOptions,
}

/// Result of a check operation
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Query executed successfully with JSON output
    Success(serde_json::Value),
}

/// Execute an rql check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    if options.syntax_only {
        if !options.query.trim().is_empty() {
            parse(&options.query)?;
        }
        return Ok(CheckResult::SyntaxValid);
    }

    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let json_value: serde_json::Value = serde_json::from_str(json_str)?;

    let query = Query::from_json(json_value)?.options(options.engine.clone());
    let result = query.apply(&options.query)?;

    Ok(CheckResult::Success(result.to_json()))
}
