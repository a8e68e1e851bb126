use crate::ast::Token;

/// Character offset into the query string.
pub type Position = usize;

/// Tokenizer for RQL queries.
///
/// The lexer only knows the grammar's delimiters: `( ) , & | =`. Any other
/// run of characters is a [`Token::Word`], trimmed of surrounding
/// whitespace. Words are returned undecoded.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_delimiter(ch: char) -> bool {
        matches!(ch, '(' | ')' | ',' | '&' | '|' | '=')
    }

    fn read_word(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if Self::is_delimiter(ch) {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result.trim_end().to_string()
    }

    /// Current offset, used to rewind after a lookahead.
    pub fn checkpoint(&self) -> Position {
        self.position
    }

    pub fn restore(&mut self, checkpoint: Position) {
        self.position = checkpoint;
    }

    /// Returns the text starting at `position`, cut to `len` characters.
    pub fn fragment(&self, position: Position, len: usize) -> String {
        self.input.iter().skip(position).take(len).collect()
    }

    /// Returns the next token together with the offset it starts at.
    pub fn next_token(&mut self) -> (Token, Position) {
        self.skip_whitespace();
        let start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('&') => {
                self.advance();
                Token::Ampersand
            }
            Some('|') => {
                self.advance();
                Token::Pipe
            }
            Some('=') => {
                self.advance();
                Token::Equals
            }
            Some(_) => Token::Word(self.read_word()),
        };

        (token, start)
    }

    /// Collects every remaining token, ending with [`Token::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let (token, _) = self.next_token();
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[test]
fn test_delimiters() {
    let mut lexer = Lexer::new("()&|,=");
    assert_eq!(lexer.next_token().0, Token::LParen);
    assert_eq!(lexer.next_token().0, Token::RParen);
    assert_eq!(lexer.next_token().0, Token::Ampersand);
    assert_eq!(lexer.next_token().0, Token::Pipe);
    assert_eq!(lexer.next_token().0, Token::Comma);
    assert_eq!(lexer.next_token().0, Token::Equals);
    assert_eq!(lexer.next_token().0, Token::Eof);
}

#[test]
fn test_call() {
    let mut lexer = Lexer::new("eq(foo, lero lero )");
    assert_eq!(lexer.next_token(), (Token::Word("eq".to_string()), 0));
    assert_eq!(lexer.next_token(), (Token::LParen, 2));
    assert_eq!(lexer.next_token(), (Token::Word("foo".to_string()), 3));
    assert_eq!(lexer.next_token(), (Token::Comma, 6));
    assert_eq!(lexer.next_token(), (Token::Word("lero lero".to_string()), 8));
    assert_eq!(lexer.next_token(), (Token::RParen, 18));
}
