//! # RQL - Abstract Syntax Tree
//!
//! This module defines the call-tree produced by the RQL parser. RQL is a
//! query language meant to be embedded in URIs: every query is a sequence of
//! operator calls, and a plain `key=value` pair is just a shorthand for
//! `eq(key,value)`.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[call]** - Call nodes and their arguments
//! - **[operators]** - The closed set of operators the query engine executes
//!
//! ## Quick Start
//!
//! ```text
//! status=active&sort(-created)&limit(10)
//! ```
//!
//! This query keeps active records, sorts them newest first and returns the
//! first ten.
//!
//! ## Core Concepts
//!
//! ### Calls
//!
//! Every clause is a call `name(arg,arg,...)`. Arguments are nested calls,
//! literals, bare field names, or parenthesized arrays:
//!
//! ```text
//! and(eq(state,FL),in(index,(1,2,3)))
//! ```
//!
//! ### Implicit Forms
//!
//! - `key=value` → `eq(key,value)`
//! - `key=op=value` → `op(key,value)`
//! - `a&b` at the top level → `and(a,b)`
//! - `(a|b)` → `or(a,b)`
//!
//! ### Literals
//!
//! Scalar tokens are percent-decoded and typed: `10` is an integer, `3.14` a
//! float, `true`/`false`/`null` are keywords, and anything else is a string.
//! An explicit tag such as `date:2017-01-01` or `string:10` forces the type.
//!
//! ## Examples
//!
//! ### Disjunction
//!
//! ```text
//! (state=Florida|state=Alabama)&gender=female
//! ```
//!
//! ### Aggregation
//!
//! ```text
//! isActive=true&aggregate(state,sum(balance),count())&sort(-sum)
//! ```
pub mod call;
pub mod operators;
pub mod tokens;

pub use call::{Arg, Call, Dir, SortKey};
pub use operators::Operator;
pub use tokens::Token;
