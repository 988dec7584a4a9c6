use thiserror::Error;

use crate::object::Object;
use crate::token::{Token, TokenType};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScannerError {
    pub line: i32,
    pub message: String,
}

#[derive(Debug)]
pub struct Scanner {
    source_chars: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ScannerError>,
    start: usize,
    current: usize,
    line: i32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source_chars: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scans the whole source. Scanning carries on past bad characters so
    /// that every error in the source is reported at once.
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>, Vec<ScannerError>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenType::EOF, "", None, self.line));

        if !self.errors.is_empty() {
            return Err(std::mem::take(&mut self.errors));
        }

        // Take our temporary tokens out. It will be replaced by the default()
        // value for the vector
        Ok(std::mem::take(&mut self.tokens))
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source_chars.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            ';' => self.add_token(TokenType::Semicolon),
            ':' => {
                let token_type =
                    if self.match_next(':') { TokenType::ColonColon } else { TokenType::Colon };
                self.add_token(token_type);
            }
            '?' => {
                let token_type = if self.match_next('.') {
                    TokenType::QuestionDot
                } else if self.match_next('?') {
                    TokenType::QuestionQuestion
                } else if self.match_next('=') {
                    TokenType::QuestionEqual
                } else {
                    TokenType::Question
                };
                self.add_token(token_type);
            }
            '-' => {
                let token_type = if self.match_next('-') {
                    TokenType::MinusMinus
                } else if self.match_next('=') {
                    TokenType::MinusEqual
                } else if self.match_next('>') {
                    TokenType::Arrow
                } else {
                    TokenType::Minus
                };
                self.add_token(token_type);
            }
            '+' => {
                let token_type = if self.match_next('+') {
                    TokenType::PlusPlus
                } else if self.match_next('=') {
                    TokenType::PlusEqual
                } else {
                    TokenType::Plus
                };
                self.add_token(token_type);
            }
            '*' => {
                let token_type = if self.peek() == '*' && self.peek_next() == '=' {
                    self.current += 2;
                    TokenType::StarStarEqual
                } else if self.match_next('=') {
                    TokenType::StarEqual
                } else {
                    TokenType::Star
                };
                self.add_token(token_type);
            }
            '!' => {
                let token_type =
                    if self.match_next('=') { TokenType::BangEqual } else { TokenType::Bang };
                self.add_token(token_type);
            }
            '=' => {
                let token_type =
                    if self.match_next('=') { TokenType::EqualEqual } else { TokenType::Equal };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_next('=') {
                    TokenType::LessEqual
                } else if self.match_next('-') {
                    TokenType::LeftArrow
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type =
                    if self.match_next('=') { TokenType::GreaterEqual } else { TokenType::Greater };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_next('/') {
                    // Go until end of the commented line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_next('=') {
                    self.add_token(TokenType::SlashEqual);
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
            }
            '"' => self.string(),
            '0'..='9' => self.number(),
            c if is_alpha(c) => self.identifier(),
            c => self.error(format!("Unexpected character '{c}'.")),
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(ScannerError { line: self.line, message: message.into() });
    }

    fn advance(&mut self) -> char {
        let ch = self.source_chars.get(self.current).copied().unwrap_or('\0');
        self.current += 1;
        ch
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.add_token_with_literal(token_type, None);
    }

    fn source_substring(&self, start: usize, end: usize) -> String {
        self.source_chars.get(start..end).map(|chars| chars.iter().collect()).unwrap_or_default()
    }

    fn add_token_with_literal(&mut self, token_type: TokenType, literal_value: Option<Object>) {
        let text = self.source_substring(self.start, self.current);
        let token = Token::new(token_type, &text, literal_value, self.line);
        self.tokens.push(token);
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.is_at_end() {
            return false;
        }

        if let Some(c) = self.source_chars.get(self.current) {
            if c == &expected {
                self.current += 1;
                return true;
            }
        }

        false
    }

    fn peek(&self) -> char {
        *self.source_chars.get(self.current).unwrap_or(&'\0')
    }

    fn peek_next(&self) -> char {
        *self.source_chars.get(self.current + 1).unwrap_or(&'\0')
    }

    fn string(&mut self) {
        let start_line = self.line;
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.errors.push(ScannerError {
                line: start_line,
                message: "Unterminated string.".to_owned(),
            });
            return;
        }

        // The closing "
        self.advance();

        // Skip the quote marks
        let text = self.source_substring(self.start + 1, self.current - 1);
        self.add_token_with_literal(TokenType::StringLiteral, Some(Object::String(text)));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            // Consume '.'
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.source_substring(self.start, self.current);
        match text.parse::<f64>() {
            Ok(value) => self.add_token_with_literal(TokenType::Number, Some(Object::Number(value))),
            Err(_) => self.error(format!("Invalid number '{text}'.")),
        }
    }

    fn identifier(&mut self) {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = self.source_substring(self.start, self.current);
        let token_type = get_keyword(&text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_numeric(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

fn get_keyword(text: &str) -> Option<TokenType> {
    let token_type = match text {
        "and" => TokenType::And,
        "as" => TokenType::As,
        "break" => TokenType::Break,
        "case" => TokenType::Case,
        "cast" => TokenType::Cast,
        "catch" => TokenType::Catch,
        "class" => TokenType::Class,
        "const" => TokenType::Const,
        "continue" => TokenType::Continue,
        "default" => TokenType::Default,
        "else" => TokenType::Else,
        "enum" => TokenType::Enum,
        "expect" => TokenType::Expect,
        "false" => TokenType::False,
        "finally" => TokenType::Finally,
        "for" => TokenType::For,
        "fun" => TokenType::Fun,
        "if" => TokenType::If,
        "interface" => TokenType::Interface,
        "length" => TokenType::Length,
        "method" => TokenType::Method,
        "module" => TokenType::Module,
        "nil" => TokenType::Nil,
        "operator" => TokenType::Operator,
        "or" => TokenType::Or,
        "return" => TokenType::Return,
        "static" => TokenType::Static,
        "super" => TokenType::Super,
        "switch" => TokenType::Switch,
        "test" => TokenType::Test,
        "this" => TokenType::This,
        "true" => TokenType::True,
        "try" => TokenType::Try,
        "typeof" => TokenType::Typeof,
        "unsigned" => TokenType::Unsigned,
        "value" => TokenType::Value,
        "var" => TokenType::Var,
        "when" => TokenType::When,
        "while" => TokenType::While,
        "num" => TokenType::NumType,
        "string" => TokenType::StringType,
        "bool" => TokenType::BoolType,
        "void" => TokenType::VoidType,
        "any" => TokenType::AnyType,
        "type" => TokenType::TypeType,
        "byte" => TokenType::ByteType,
        "obj" => TokenType::ObjType,
        _ => return None,
    };
    Some(token_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        Scanner::new(source).scan_tokens().unwrap().iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn compound_operators() {
        assert_eq!(
            types("+= ++ -= -- *= **= /= -> <- :: ?. ?? ?="),
            vec![
                TokenType::PlusEqual,
                TokenType::PlusPlus,
                TokenType::MinusEqual,
                TokenType::MinusMinus,
                TokenType::StarEqual,
                TokenType::StarStarEqual,
                TokenType::SlashEqual,
                TokenType::Arrow,
                TokenType::LeftArrow,
                TokenType::ColonColon,
                TokenType::QuestionDot,
                TokenType::QuestionQuestion,
                TokenType::QuestionEqual,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn keywords_and_type_names() {
        assert_eq!(
            types("class Foo <- Bar num string obj"),
            vec![
                TokenType::Class,
                TokenType::Identifier,
                TokenType::LeftArrow,
                TokenType::Identifier,
                TokenType::NumType,
                TokenType::StringType,
                TokenType::ObjType,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn errors_are_collected() {
        let errors = Scanner::new("var a = @;\n\"open").scan_tokens().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].message, "Unterminated string.");
    }
}
