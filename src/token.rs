use std::fmt::Display;

use crate::object::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,

    // One, two or three character tokens.
    Minus,
    MinusEqual,
    MinusMinus,
    Plus,
    PlusEqual,
    PlusPlus,
    Slash,
    SlashEqual,
    Star,
    StarEqual,
    StarStarEqual,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Arrow,
    LeftArrow,
    ColonColon,
    QuestionDot,
    QuestionQuestion,
    QuestionEqual,

    // Literals.
    Identifier,
    StringLiteral,
    Number,

    // Keywords.
    And,
    As,
    Break,
    Case,
    Cast,
    Catch,
    Class,
    Const,
    Continue,
    Default,
    Else,
    Enum,
    Expect,
    False,
    Finally,
    For,
    Fun,
    If,
    Interface,
    Length,
    Method,
    Module,
    Nil,
    Operator,
    Or,
    Return,
    Static,
    Super,
    Switch,
    Test,
    This,
    True,
    Try,
    Typeof,
    Unsigned,
    Value,
    Var,
    When,
    While,

    // Type keywords.
    NumType,
    StringType,
    BoolType,
    VoidType,
    AnyType,
    TypeType,
    ByteType,
    ObjType,

    EOF,
}

impl TokenType {
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenType::NumType
                | TokenType::StringType
                | TokenType::BoolType
                | TokenType::VoidType
                | TokenType::AnyType
                | TokenType::TypeType
                | TokenType::ByteType
                | TokenType::ObjType
        )
    }

    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            TokenType::Const
                | TokenType::Static
                | TokenType::Operator
                | TokenType::Cast
                | TokenType::Unsigned
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Object>,
    pub line: i32,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: &str, literal: Option<Object>, line: i32) -> Self {
        Self { token_type, lexeme: lexeme.to_owned(), literal, line }
    }

    /// A token that never came from source text, used for implicit names
    /// such as `this` and `super`.
    pub fn synthetic(lexeme: &str, line: i32) -> Self {
        Self::new(TokenType::Identifier, lexeme, None, line)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {} {:?}", self.token_type, self.lexeme, self.literal)
    }
}
