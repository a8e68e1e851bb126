//! Inspect query syntax without running it

use super::CliError;
use crate::{convert::call_to_json, parse, to_rql};

/// Parses a query and returns its call-tree as JSON.
pub fn execute_parse(query: &str) -> Result<serde_json::Value, CliError> {
    Ok(call_to_json(&parse(query)?))
}

/// Parses a query and prints it back in canonical form.
pub fn execute_normalize(query: &str) -> Result<String, CliError> {
    Ok(to_rql(&parse(query)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_outputs_call_tree() {
        assert_eq!(
            execute_parse("ten=10").unwrap(),
            json!({"name": "eq", "args": ["ten", 10]})
        );
    }

    #[test]
    fn normalize_expands_shorthand() {
        assert_eq!(
            execute_normalize("a=1&(b=2|c=lt=3)").unwrap(),
            "and(eq(a,1),or(eq(b,2),lt(c,3)))"
        );
    }
}
