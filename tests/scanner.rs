use pretty_assertions::assert_eq;
use tlox::prelude::{Scanner, TokenType};

fn token_types(input: &str) -> Vec<TokenType> {
    let tokens = Scanner::new(input).scan_tokens().expect("failed to scan");
    tokens.into_iter().map(|t| t.token_type).collect()
}

#[test]
fn scanner_works() {
    let input = "2 and 3";
    let mut scanner = Scanner::new(input);
    let tokens = scanner.scan_tokens().unwrap();
    assert_eq!(tokens.len(), 4);
}

#[test]
fn typed_declaration_tokens() {
    assert_eq!(
        token_types("unsigned num[] xs = [num; 2];"),
        vec![
            TokenType::Unsigned,
            TokenType::NumType,
            TokenType::LeftBracket,
            TokenType::RightBracket,
            TokenType::Identifier,
            TokenType::Equal,
            TokenType::LeftBracket,
            TokenType::NumType,
            TokenType::Semicolon,
            TokenType::Number,
            TokenType::RightBracket,
            TokenType::Semicolon,
            TokenType::EOF,
        ]
    );
}

#[test]
fn lines_are_counted() {
    let tokens = Scanner::new("var a;\n// comment\n\"two\nlines\";\nvar b;").scan_tokens().unwrap();
    let b = tokens.iter().find(|t| t.lexeme == "b").unwrap();
    assert_eq!(b.line, 5);
}

#[test]
fn unterminated_string_is_an_error() {
    let errors = Scanner::new("\"open").scan_tokens().unwrap_err();
    assert_eq!(errors.len(), 1);
}
