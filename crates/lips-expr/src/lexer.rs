//! Expression Lexer
//!
//! Tokenizes template expressions. Template literals are split into their
//! string and `${...}` parts here; the parser parses each part separately.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::ParseError;
use crate::token::{keyword_from_str, Span, TemplatePart, Token, TokenKind};

/// Expression Lexer
#[derive(Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    chars: Peekable<Chars<'src>>,
    pos: u32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            pos: 0,
        }
    }

    /// Peek at the next character
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the character after next
    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.pos as usize..].chars();
        iter.next();
        iter.next()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    /// Consume `expected` if it is next
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>, start: u32) -> ParseError {
        ParseError::new(message, Span::new(start, self.pos))
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    while let Some(c) = self.advance() {
                        if c == '*' && self.peek() == Some('/') {
                            self.advance();
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let Some(c) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        };

        let kind = match c {
            c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_identifier(start),
            '0'..='9' => self.scan_number(start)?,
            '"' | '\'' => TokenKind::String(self.scan_string(c, start)?.into()),
            '`' => self.scan_template_literal(start)?,

            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,

            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else if matches!(self.peek(), Some('0'..='9')) {
                    self.scan_number(start)?
                } else {
                    TokenKind::Dot
                }
            }

            '?' => {
                if self.eat('?') {
                    TokenKind::QuestionQuestion
                } else if self.peek() == Some('.') && !matches!(self.peek_next(), Some('0'..='9')) {
                    self.advance();
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                }
            }

            '+' => match self.peek() {
                Some('+') => { self.advance(); TokenKind::PlusPlus }
                Some('=') => { self.advance(); TokenKind::PlusEq }
                _ => TokenKind::Plus,
            },

            '-' => match self.peek() {
                Some('-') => { self.advance(); TokenKind::MinusMinus }
                Some('=') => { self.advance(); TokenKind::MinusEq }
                _ => TokenKind::Minus,
            },

            '*' => if self.eat('*') { TokenKind::StarStar } else { TokenKind::Star },
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            '!' => {
                if self.eat('=') {
                    if self.eat('=') { TokenKind::NotEqEq } else { TokenKind::NotEq }
                } else {
                    TokenKind::Bang
                }
            }

            '=' => {
                if self.eat('=') {
                    if self.eat('=') { TokenKind::EqEqEq } else { TokenKind::EqEq }
                } else if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Eq
                }
            }

            '<' => if self.eat('=') { TokenKind::LessThanEq } else { TokenKind::LessThan },
            '>' => if self.eat('=') { TokenKind::GreaterThanEq } else { TokenKind::GreaterThan },

            '&' if self.eat('&') => TokenKind::AmpersandAmpersand,
            '|' if self.eat('|') => TokenKind::PipePipe,

            other => return Err(self.error(format!("Unexpected character '{}'", other), start)),
        };

        Ok(Token::new(kind, Span::new(start, self.pos)))
    }

    fn scan_identifier(&mut self, start: u32) -> TokenKind {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start as usize..self.pos as usize];
        keyword_from_str(text).unwrap_or_else(|| TokenKind::Identifier(text.into()))
    }

    fn scan_number(&mut self, start: u32) -> Result<TokenKind, ParseError> {
        // Hex literal
        if &self.source[start as usize..self.pos as usize] == "0" && matches!(self.peek(), Some('x' | 'X')) {
            self.advance();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.source[digits_start as usize..self.pos as usize];
            return u64::from_str_radix(digits, 16)
                .map(|n| TokenKind::Number(n as f64))
                .map_err(|_| self.error("Invalid hex literal", start));
        }

        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => { self.advance(); }
                '.' if matches!(self.peek_next(), Some('0'..='9')) => { self.advance(); }
                'e' | 'E' => {
                    self.advance();
                    if matches!(self.peek(), Some('+' | '-')) {
                        self.advance();
                    }
                }
                _ => break,
            }
        }

        let text: String = self.source[start as usize..self.pos as usize]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        text.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("Invalid number '{}'", text), start))
    }

    fn scan_escape(&mut self, out: &mut String, start: u32) -> Result<(), ParseError> {
        let Some(c) = self.advance() else {
            return Err(self.error("Unterminated escape", start));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'u' => {
                let mut hex = String::new();
                if self.eat('{') {
                    while let Some(h) = self.advance() {
                        if h == '}' {
                            break;
                        }
                        hex.push(h);
                    }
                } else {
                    for _ in 0..4 {
                        if let Some(h) = self.advance() {
                            hex.push(h);
                        }
                    }
                }
                let ch = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("Invalid unicode escape", start))?;
                out.push(ch);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn scan_string(&mut self, quote: char, start: u32) -> Result<String, ParseError> {
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated string literal", start)),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => self.scan_escape(&mut value, start)?,
                Some(c) => value.push(c),
            }
        }
    }

    fn scan_template_literal(&mut self, start: u32) -> Result<TokenKind, ParseError> {
        let mut parts = Vec::new();
        let mut current = String::new();

        loop {
            match self.advance() {
                None => return Err(self.error("Unterminated template literal", start)),
                Some('`') => break,
                Some('\\') => self.scan_escape(&mut current, start)?,
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    if !current.is_empty() {
                        parts.push(TemplatePart::Str(std::mem::take(&mut current)));
                    }
                    parts.push(TemplatePart::Expr(self.scan_template_expr(start)?));
                }
                Some(c) => current.push(c),
            }
        }

        if !current.is_empty() {
            parts.push(TemplatePart::Str(current));
        }
        Ok(TokenKind::Template(parts))
    }

    /// Source of a `${...}` part, up to its matching brace
    fn scan_template_expr(&mut self, start: u32) -> Result<String, ParseError> {
        let expr_start = self.pos as usize;
        let mut depth = 0usize;

        loop {
            let here = self.pos as usize;
            match self.advance() {
                None => return Err(self.error("Unterminated template expression", start)),
                Some('{') => depth += 1,
                Some('}') if depth == 0 => return Ok(self.source[expr_start..here].to_string()),
                Some('}') => depth -= 1,
                Some(q @ ('"' | '\'')) => {
                    self.scan_string(q, start)?;
                }
                Some('`') => {
                    self.scan_template_literal(start)?;
                }
                Some(_) => {}
            }
        }
    }
}
