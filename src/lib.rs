pub mod ast;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod literal;
pub mod output;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod query;
pub mod stage;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Arg, Call, Dir, Operator, SortKey, Token};
pub use error::RqlError;
pub use evaluator::{EvalError, Evaluator};
pub use lexer::{Lexer, Position};
pub use literal::{LiteralError, TypeTag};
pub use output::to_rql;
pub use parser::{ParseError, ParseErrorKind, Parser, parse};
pub use pipeline::PipelineState;
pub use query::{Query, QueryOptions};
pub use value::{Record, Value};
