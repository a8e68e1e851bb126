/// Lexical token of an RQL query.
///
/// RQL has very few delimiters; everything between them is a [`Token::Word`]
/// that the parser later resolves into an operator name, a field name or a
/// typed literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Raw scalar text between delimiters, surrounding whitespace trimmed.
    ///
    /// Percent escapes are *not* decoded by the lexer, so an encoded `%26`
    /// never splits a clause.
    ///
    /// # Examples
    /// ```text
    /// eq
    /// lero%20lero
    /// date:2017-01-01
    /// -created
    /// ```
    Word(String),

    /// Opens an argument list, an array or a group
    LParen,

    /// Closes an argument list, an array or a group
    RParen,

    /// Separates arguments, array elements, and top-level clauses
    Comma,

    /// Conjunction of clauses
    ///
    /// # Examples
    /// ```text
    /// a=1&b=2
    /// ```
    Ampersand,

    /// Disjunction of clauses, only valid inside parentheses
    ///
    /// # Examples
    /// ```text
    /// (a=1|b=2)
    /// ```
    Pipe,

    /// Implicit comparison
    ///
    /// # Examples
    /// ```text
    /// key=value
    /// price=lt=10
    /// ```
    Equals,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{}'", w),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Ampersand => "'&'".to_string(),
            Token::Pipe => "'|'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
