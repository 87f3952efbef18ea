//! Token Types
//!
//! Token definitions for the template expression language.

/// Source span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Token with kind and span
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Piece of a template literal, before its expressions are parsed
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Str(String),
    Expr(String),
}

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(Box<str>),
    Template(Vec<TemplatePart>),
    True,
    False,
    Null,
    Undefined,

    Identifier(Box<str>),
    Typeof,

    // Punctuators
    LBrace,      // {
    RBrace,      // }
    LParen,      // (
    RParen,      // )
    LBracket,    // [
    RBracket,    // ]
    Dot,         // .
    DotDotDot,   // ...
    Comma,       // ,
    Colon,       // :
    Question,    // ?
    QuestionDot, // ?.
    Arrow,       // =>

    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Bang,
    LessThan,
    LessThanEq,
    GreaterThan,
    GreaterThanEq,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    AmpersandAmpersand,
    PipePipe,
    QuestionQuestion,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,

    Eof,
}

/// Map reserved words to their token
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    match s {
        "true" => Some(TokenKind::True),
        "false" => Some(TokenKind::False),
        "null" => Some(TokenKind::Null),
        "undefined" => Some(TokenKind::Undefined),
        "typeof" => Some(TokenKind::Typeof),
        _ => None,
    }
}
