// tests/lexer_tests.rs

use rql_lang::ast::Token;
use rql_lang::lexer::Lexer;

fn word(s: &str) -> Token {
    Token::Word(s.to_string())
}

// ============================================================================
// Delimiters and words
// ============================================================================

#[test]
fn test_key_value() {
    let tokens = Lexer::new("ten=10").tokenize();
    assert_eq!(tokens, vec![word("ten"), Token::Equals, word("10"), Token::Eof]);
}

#[test]
fn test_conjunction() {
    let tokens = Lexer::new("a=1&b=2").tokenize();
    assert_eq!(
        tokens,
        vec![
            word("a"),
            Token::Equals,
            word("1"),
            Token::Ampersand,
            word("b"),
            Token::Equals,
            word("2"),
            Token::Eof,
        ]
    );
}

#[test]
fn test_group_with_pipe() {
    let tokens = Lexer::new("(a=1|b=2)").tokenize();
    assert_eq!(tokens[0], Token::LParen);
    assert_eq!(tokens[4], Token::Pipe);
    assert_eq!(tokens[8], Token::RParen);
    assert_eq!(tokens[9], Token::Eof);
}

#[test]
fn test_nested_call() {
    let tokens = Lexer::new("and(eq(a,1),in(b,(x,y)))").tokenize();
    let words: Vec<&Token> = tokens
        .iter()
        .filter(|t| matches!(t, Token::Word(_)))
        .collect();
    assert_eq!(
        words,
        vec![
            &word("and"),
            &word("eq"),
            &word("a"),
            &word("1"),
            &word("in"),
            &word("b"),
            &word("x"),
            &word("y"),
        ]
    );
}

// ============================================================================
// Whitespace and raw text
// ============================================================================

#[test]
fn test_whitespace_is_trimmed() {
    let tokens = Lexer::new("  eq( a ,  1 )  ").tokenize();
    assert_eq!(
        tokens,
        vec![
            word("eq"),
            Token::LParen,
            word("a"),
            Token::Comma,
            word("1"),
            Token::RParen,
            Token::Eof,
        ]
    );
}

#[test]
fn test_inner_spaces_are_kept() {
    let tokens = Lexer::new("eq(foo,lero lero)").tokenize();
    assert_eq!(tokens[4], word("lero lero"));
}

#[test]
fn test_words_are_not_decoded() {
    let tokens = Lexer::new("eq(foo,lero%20lero)").tokenize();
    assert_eq!(tokens[4], word("lero%20lero"));
}

#[test]
fn test_sort_prefixes_stay_in_words() {
    let tokens = Lexer::new("sort(+name,-age)").tokenize();
    assert_eq!(tokens[2], word("+name"));
    assert_eq!(tokens[4], word("-age"));
}

#[test]
fn test_tags_stay_in_words() {
    let tokens = Lexer::new("eq(at,datetime:2009-02-13T23:31:30Z)").tokenize();
    assert_eq!(tokens[4], word("datetime:2009-02-13T23:31:30Z"));
}

// ============================================================================
// Positions
// ============================================================================

#[test]
fn test_positions() {
    let mut lexer = Lexer::new("a=1 & b=2");
    assert_eq!(lexer.next_token(), (word("a"), 0));
    assert_eq!(lexer.next_token(), (Token::Equals, 1));
    assert_eq!(lexer.next_token(), (word("1"), 2));
    assert_eq!(lexer.next_token(), (Token::Ampersand, 4));
    assert_eq!(lexer.next_token(), (word("b"), 6));
}

#[test]
fn test_checkpoint_restore() {
    let mut lexer = Lexer::new("eq(a,1)");
    lexer.next_token();
    let checkpoint = lexer.checkpoint();
    assert_eq!(lexer.next_token().0, Token::LParen);
    assert_eq!(lexer.next_token().0, word("a"));
    lexer.restore(checkpoint);
    assert_eq!(lexer.next_token().0, Token::LParen);
}

#[test]
fn test_fragment() {
    let lexer = Lexer::new("eq(a,1)&limit(10)");
    assert_eq!(lexer.fragment(8, 5), "limit");
    assert_eq!(lexer.fragment(15, 24), "0)");
}

#[test]
fn test_empty_input() {
    assert_eq!(Lexer::new("").tokenize(), vec![Token::Eof]);
    assert_eq!(Lexer::new("   ").tokenize(), vec![Token::Eof]);
}
