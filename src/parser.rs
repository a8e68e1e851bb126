use std::mem;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{Arg, Call, Dir, SortKey, Token},
    lexer::{Lexer, Position},
    literal::{LiteralError, resolve_literal},
    value::Value,
};

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Length of the query excerpt attached to syntax errors.
const FRAGMENT_LEN: usize = 24;

const END_OF_QUERY: &str = "'&' or end of input";

/// What went wrong while parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("empty query")]
    Empty,

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("unbalanced parentheses: {0}")]
    Unbalanced(&'static str),

    #[error("invalid operator name '{0}'")]
    InvalidName(String),

    #[error("{0}")]
    Literal(#[from] LiteralError),

    #[error("cannot mix '&' and '|' in one group; add parentheses")]
    MixedGroup,

    #[error("'|' must be enclosed in parentheses")]
    BareOr,
}

/// Syntax error with the position and text where parsing stopped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at position {position} near `{fragment}`")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: Position,
    pub fragment: String,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser turning an RQL query into a [`Call`] tree.
///
/// ```text
/// query      := clause (('&' | ',') clause)* EOF
/// clause     := group | call | comparison
/// group      := '(' clause (('|' clause)* | ('&' clause)*) ')'
/// call       := NAME '(' [arg (',' arg)*] ')'
/// comparison := value '=' [NAME '='] value
/// arg        := call | sortarg | value
/// value      := array | WORD
/// array      := '(' value (',' value)* ')'
/// ```
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_position: Position,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let (current_token, current_position) = lexer.next_token();
        Parser {
            lexer,
            current_token,
            current_position,
        }
    }

    fn advance(&mut self) {
        let (token, position) = self.lexer.next_token();
        self.current_token = token;
        self.current_position = position;
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        self.error_at(kind, self.current_position)
    }

    fn error_at(&self, kind: ParseErrorKind, position: Position) -> ParseError {
        ParseError {
            kind,
            position,
            fragment: self.lexer.fragment(position, FRAGMENT_LEN),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        // A missing ')' at the end, or a stray ')' after a clause, is a nesting problem
        let kind = match (&self.current_token, expected) {
            (Token::Eof, "')'") => ParseErrorKind::Unbalanced("missing ')'"),
            (Token::RParen, END_OF_QUERY) => ParseErrorKind::Unbalanced("unexpected ')'"),
            _ => ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: self.current_token.describe(),
            },
        };
        self.error(kind)
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if !self.check(&expected) {
            return Err(self.unexpected(&expected.describe()));
        }
        self.advance();
        Ok(())
    }

    /// Token after the current one, without consuming anything.
    fn peek(&mut self) -> Token {
        let checkpoint = self.lexer.checkpoint();
        let (token, _) = self.lexer.next_token();
        self.lexer.restore(checkpoint);
        token
    }

    /// With the current token on a `(`, reports whether its matching `)` is
    /// directly followed by `=`, which makes the parentheses a tuple key.
    fn parens_precede_equals(&mut self) -> bool {
        let checkpoint = self.lexer.checkpoint();
        let mut depth = 1usize;

        let followed_by_equals = loop {
            match self.lexer.next_token().0 {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        break self.lexer.next_token().0 == Token::Equals;
                    }
                }
                Token::Eof => break false,
                _ => {}
            }
        };

        self.lexer.restore(checkpoint);
        followed_by_equals
    }

    /// Parse a complete query.
    ///
    /// Several top-level clauses are wrapped in an implicit `and`.
    pub fn parse(&mut self) -> ParseResult<Call> {
        if self.check(&Token::Eof) {
            return Err(self.error(ParseErrorKind::Empty));
        }

        let mut clauses = vec![self.parse_clause()?];
        while self.check(&Token::Ampersand) || self.check(&Token::Comma) {
            self.advance();
            clauses.push(self.parse_clause()?);
        }

        match self.current_token {
            Token::Eof => Ok(Call::conjunction(clauses)),
            Token::Pipe => Err(self.error(ParseErrorKind::BareOr)),
            _ => Err(self.unexpected(END_OF_QUERY)),
        }
    }

    fn parse_clause(&mut self) -> ParseResult<Call> {
        match &self.current_token {
            Token::LParen => {
                if self.parens_precede_equals() {
                    self.parse_comparison()
                } else {
                    self.parse_group()
                }
            }
            Token::Word(_) => match self.peek() {
                Token::LParen => self.parse_call(),
                Token::Equals => self.parse_comparison(),
                _ => {
                    self.advance();
                    Err(self.unexpected("'(' or '='"))
                }
            },
            _ => Err(self.unexpected("a query clause")),
        }
    }

    fn parse_group(&mut self) -> ParseResult<Call> {
        let start = self.current_position;
        self.expect(Token::LParen)?;

        let mut clauses = vec![self.parse_clause()?];
        let mut disjunction = None;

        loop {
            let is_or = match self.current_token {
                Token::Pipe => true,
                Token::Ampersand | Token::Comma => false,
                _ => break,
            };

            match disjunction {
                Some(previous) if previous != is_or => {
                    return Err(self.error(ParseErrorKind::MixedGroup));
                }
                _ => disjunction = Some(is_or),
            }

            self.advance();
            clauses.push(self.parse_clause()?);
        }

        if self.check(&Token::Eof) {
            return Err(self.error_at(ParseErrorKind::Unbalanced("missing ')'"), start));
        }
        self.expect(Token::RParen)?;

        Ok(match disjunction {
            Some(true) => Call::disjunction(clauses),
            _ => Call::conjunction(clauses),
        })
    }

    fn parse_name(&mut self) -> ParseResult<String> {
        let name = match &self.current_token {
            Token::Word(word) => word.clone(),
            _ => return Err(self.unexpected("an operator name")),
        };

        if !NAME.is_match(&name) {
            return Err(self.error(ParseErrorKind::InvalidName(name)));
        }

        self.advance();
        Ok(name)
    }

    fn parse_call(&mut self) -> ParseResult<Call> {
        let start = self.current_position;
        let name = self.parse_name()?;
        self.expect(Token::LParen)?;

        let is_sort = name == "sort";
        let mut args = vec![];

        if !self.check(&Token::RParen) {
            args.push(self.parse_arg(is_sort)?);
            while self.check(&Token::Comma) {
                self.advance();
                args.push(self.parse_arg(is_sort)?);
            }
        }

        if self.check(&Token::Eof) {
            return Err(self.error_at(ParseErrorKind::Unbalanced("missing ')'"), start));
        }
        self.expect(Token::RParen)?;

        Ok(Call::new(name, args))
    }

    fn parse_arg(&mut self, is_sort: bool) -> ParseResult<Arg> {
        if let Token::Word(word) = &self.current_token {
            if is_sort && let Some(dir) = sort_prefix(word) {
                return self.parse_sort_key(dir);
            }
            if self.peek() == Token::LParen {
                return self.parse_call().map(Arg::Call);
            }
        }

        self.parse_value().map(Arg::Value)
    }

    fn parse_sort_key(&mut self, dir: Dir) -> ParseResult<Arg> {
        let Token::Word(word) = &self.current_token else {
            return Err(self.unexpected("a sort key"));
        };
        let word = word.clone();
        let position = self.current_position;

        // A bare `+`/`-` prefixes a parenthesized tuple key
        let rest = word[1..].trim_start();
        let key = if rest.is_empty() {
            self.advance();
            if !self.check(&Token::LParen) {
                return Err(self.unexpected("a sort key"));
            }
            self.parse_array()?
        } else {
            let key = self.resolve(rest, position + 1)?;
            self.advance();
            key
        };

        Ok(Arg::Sort(SortKey { dir, key }))
    }

    fn parse_comparison(&mut self) -> ParseResult<Call> {
        let field = self.parse_value()?;
        self.expect(Token::Equals)?;

        // FIQL form: field=op=value
        let mut name = "eq".to_string();
        if matches!(self.current_token, Token::Word(_)) && self.peek() == Token::Equals {
            name = self.parse_name()?;
            self.expect(Token::Equals)?;
        }

        let value = self.parse_value()?;
        Ok(Call::new(name, vec![Arg::Value(field), Arg::Value(value)]))
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        match &self.current_token {
            Token::LParen => self.parse_array(),
            Token::Word(word) => {
                let value = self.resolve(word, self.current_position)?;
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Value> {
        let start = self.current_position;
        self.expect(Token::LParen)?;

        let mut elements = vec![self.parse_value()?];
        while self.check(&Token::Comma) {
            self.advance();
            elements.push(self.parse_value()?);
        }

        if self.check(&Token::Eof) {
            return Err(self.error_at(ParseErrorKind::Unbalanced("missing ')'"), start));
        }
        self.expect(Token::RParen)?;
        Ok(Value::Array(elements))
    }

    fn resolve(&self, raw: &str, position: Position) -> ParseResult<Value> {
        resolve_literal(raw).map_err(|e| self.error_at(ParseErrorKind::Literal(e), position))
    }
}

fn sort_prefix(word: &str) -> Option<Dir> {
    match word.chars().next()? {
        '+' => Some(Dir::Asc),
        '-' => Some(Dir::Desc),
        _ => None,
    }
}

/// Parses a query string into its call-tree.
///
/// # Examples
///
/// ```
/// use rql_lang::{parse, Call, Value};
///
/// let p1 = parse("(a,b)=1").unwrap();
/// assert_eq!(
///     p1,
///     Call::new(
///         "eq",
///         vec![Value::Array(vec!["a".into(), "b".into()]).into(), Value::Integer(1).into()]
///     )
/// );
/// ```
pub fn parse(query: &str) -> ParseResult<Call> {
    Parser::new(Lexer::new(query)).parse()
}
