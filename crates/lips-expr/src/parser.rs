//! Expression Parser
//!
//! Recursive descent, one function per precedence level (lowest first):
//! assignment/arrow, conditional, `??`, `||`, `&&`, equality, comparison,
//! additive, multiplicative, exponent, unary, postfix, call/member, primary.

use std::rc::Rc;

use crate::ast::{
    Arrow, AssignOp, BinaryOp, Element, Expr, Literal, LogicalOp, MemberProperty, Property,
    PropertyKey, TemplateSegment, UnaryOp, UpdateOp,
};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{TemplatePart, Token, TokenKind};

/// Deepest nesting of sub-expressions, brackets and unary operators
pub const MAX_NESTING: usize = 256;

/// Expression Parser
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, depth: 0 })
    }

    /// Parse one nesting level deeper
    fn nested(&mut self, parse: fn(&mut Self) -> Result<Expr, ParseError>) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new("Expression nested too deeply", self.current.span));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn consume(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", kind)))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("Expected {}, got {:?}", expected, self.current.kind),
            self.current.span,
        )
    }

    /// Kind of the token after the current one
    fn peek_kind(&self) -> Result<TokenKind, ParseError> {
        Ok(self.lexer.clone().next_token()?.kind)
    }

    /// Parse a complete expression
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if !self.check(&TokenKind::Eof) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        if self.at_arrow()? {
            return self.parse_arrow();
        }

        let target = self.parse_conditional()?;

        let operator = match self.current.kind {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(ParseError::new("Invalid assignment target", self.current.span));
        }
        self.advance()?;
        let value = self.parse_assignment()?;

        Ok(Expr::Assign {
            operator,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// Whether the current token starts an arrow function
    fn at_arrow(&self) -> Result<bool, ParseError> {
        match &self.current.kind {
            TokenKind::Identifier(_) => Ok(self.peek_kind()? == TokenKind::Arrow),
            TokenKind::LParen => {
                let mut lexer = self.lexer.clone();
                let mut depth = 1usize;
                while depth > 0 {
                    match lexer.next_token()?.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => depth -= 1,
                        TokenKind::Eof => return Ok(false),
                        _ => {}
                    }
                }
                Ok(lexer.next_token()?.kind == TokenKind::Arrow)
            }
            _ => Ok(false),
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr, ParseError> {
        let mut params = Vec::new();

        if let TokenKind::Identifier(name) = &self.current.kind {
            params.push(name.clone());
            self.advance()?;
        } else {
            self.consume(TokenKind::LParen)?;
            while !self.check(&TokenKind::RParen) {
                match &self.current.kind {
                    TokenKind::Identifier(name) => {
                        params.push(name.clone());
                        self.advance()?;
                    }
                    _ => return Err(self.unexpected("parameter name")),
                }
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
            self.consume(TokenKind::RParen)?;
        }

        self.consume(TokenKind::Arrow)?;
        let body = self.parse_assignment()?;
        Ok(Expr::Arrow(Rc::new(Arrow { params, body })))
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.parse_nullish()?;

        if !self.eat(&TokenKind::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.consume(TokenKind::Colon)?;
        let alternate = self.parse_assignment()?;

        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_nullish(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_or()?;

        while self.eat(&TokenKind::QuestionQuestion)? {
            let right = self.parse_logical_or()?;
            left = logical(LogicalOp::NullishCoalescing, left, right);
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.eat(&TokenKind::PipePipe)? {
            let right = self.parse_logical_and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;

        while self.eat(&TokenKind::AmpersandAmpersand)? {
            let right = self.parse_equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = match self.current.kind {
                TokenKind::EqEq => BinaryOp::Equal,
                TokenKind::NotEq => BinaryOp::NotEqual,
                TokenKind::EqEqEq => BinaryOp::StrictEqual,
                TokenKind::NotEqEq => BinaryOp::StrictNotEqual,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_comparison()?;
            left = binary(op, left, right);
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current.kind {
                TokenKind::LessThan => BinaryOp::LessThan,
                TokenKind::LessThanEq => BinaryOp::LessThanEq,
                TokenKind::GreaterThan => BinaryOp::GreaterThan,
                TokenKind::GreaterThanEq => BinaryOp::GreaterThanEq,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_exponent()?;
            left = binary(op, left, right);
        }
    }

    fn parse_exponent(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_unary()?;

        if self.eat(&TokenKind::StarStar)? {
            // right associative
            let exponent = self.nested(Self::parse_exponent)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let operator = match self.current.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let operator = if self.check(&TokenKind::PlusPlus) {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                self.advance()?;
                let target = self.nested(Self::parse_unary)?;
                return update(operator, true, target);
            }
            _ => return self.parse_postfix(),
        };

        self.advance()?;
        let argument = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary { operator, argument: Box::new(argument) })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_call()?;

        let operator = match self.current.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.advance()?;
        update(operator, false, expr)
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.parse_property_name()?;
                    expr = member(expr, MemberProperty::Name(name), false);
                }
                TokenKind::QuestionDot => {
                    self.advance()?;
                    expr = match self.current.kind {
                        TokenKind::LParen => {
                            self.advance()?;
                            let arguments = self.parse_arguments(TokenKind::RParen)?;
                            call(expr, arguments, true)
                        }
                        TokenKind::LBracket => {
                            self.advance()?;
                            let property = self.parse_expression()?;
                            self.consume(TokenKind::RBracket)?;
                            member(expr, MemberProperty::Computed(Box::new(property)), true)
                        }
                        _ => {
                            let name = self.parse_property_name()?;
                            member(expr, MemberProperty::Name(name), true)
                        }
                    };
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let property = self.parse_expression()?;
                    self.consume(TokenKind::RBracket)?;
                    expr = member(expr, MemberProperty::Computed(Box::new(property)), false);
                }
                TokenKind::LParen => {
                    self.advance()?;
                    let arguments = self.parse_arguments(TokenKind::RParen)?;
                    expr = call(expr, arguments, false);
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Property name after `.`; reserved words are valid names here
    fn parse_property_name(&mut self) -> Result<Box<str>, ParseError> {
        let name: Box<str> = match &self.current.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::True => "true".into(),
            TokenKind::False => "false".into(),
            TokenKind::Null => "null".into(),
            TokenKind::Undefined => "undefined".into(),
            TokenKind::Typeof => "typeof".into(),
            _ => return Err(self.unexpected("property name")),
        };
        self.advance()?;
        Ok(name)
    }

    /// Comma-separated elements (with spread) up to and including `close`
    fn parse_arguments(&mut self, close: TokenKind) -> Result<Vec<Element>, ParseError> {
        let mut items = Vec::new();

        while !self.check(&close) {
            if self.eat(&TokenKind::DotDotDot)? {
                items.push(Element::Spread(self.parse_assignment()?));
            } else {
                items.push(Element::Item(self.parse_assignment()?));
            }
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.consume(close)?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance()?;

        let expr = match token.kind {
            TokenKind::Number(n) => Expr::Literal(Literal::Number(n)),
            TokenKind::String(s) => Expr::Literal(Literal::String(s)),
            TokenKind::True => Expr::Literal(Literal::Bool(true)),
            TokenKind::False => Expr::Literal(Literal::Bool(false)),
            TokenKind::Null => Expr::Literal(Literal::Null),
            TokenKind::Undefined => Expr::Literal(Literal::Undefined),
            TokenKind::Identifier(name) => Expr::Identifier(name),
            TokenKind::Template(parts) => self.parse_template(parts)?,
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RParen)?;
                inner
            }
            TokenKind::LBracket => Expr::Array(self.parse_arguments(TokenKind::RBracket)?),
            TokenKind::LBrace => self.parse_object_literal()?,
            other => {
                return Err(ParseError::new(format!("Unexpected token {:?}", other), token.span));
            }
        };
        Ok(expr)
    }

    fn parse_template(&mut self, parts: Vec<TemplatePart>) -> Result<Expr, ParseError> {
        let mut segments = Vec::with_capacity(parts.len());
        for part in parts {
            segments.push(match part {
                TemplatePart::Str(s) => TemplateSegment::Str(s),
                TemplatePart::Expr(source) => {
                    let mut inner = Parser::new(&source)?;
                    inner.depth = self.depth;
                    TemplateSegment::Expr(inner.parse()?)
                }
            });
        }
        Ok(Expr::Template(segments))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            if self.eat(&TokenKind::DotDotDot)? {
                properties.push(Property::Spread(self.parse_assignment()?));
            } else {
                let key_token = self.advance()?;
                let (key, shorthand) = match key_token.kind {
                    TokenKind::Identifier(name) => (PropertyKey::Static(name.clone()), Some(name)),
                    TokenKind::String(s) => (PropertyKey::Static(s), None),
                    TokenKind::Number(n) => (PropertyKey::Static(crate::value::format_number(n).into()), None),
                    TokenKind::True => (PropertyKey::Static("true".into()), None),
                    TokenKind::False => (PropertyKey::Static("false".into()), None),
                    TokenKind::Null => (PropertyKey::Static("null".into()), None),
                    TokenKind::LBracket => {
                        let key = self.parse_assignment()?;
                        self.consume(TokenKind::RBracket)?;
                        (PropertyKey::Computed(key), None)
                    }
                    other => {
                        return Err(ParseError::new(
                            format!("Unexpected token {:?} in object literal", other),
                            key_token.span,
                        ));
                    }
                };

                let value = if self.eat(&TokenKind::Colon)? {
                    self.parse_assignment()?
                } else if let Some(name) = shorthand {
                    Expr::Identifier(name)
                } else {
                    return Err(self.unexpected("':'"));
                };
                properties.push(Property::KeyValue { key, value });
            }

            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Expr::Object(properties))
    }
}

fn binary(operator: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary { operator, left: Box::new(left), right: Box::new(right) }
}

fn logical(operator: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical { operator, left: Box::new(left), right: Box::new(right) }
}

fn member(object: Expr, property: MemberProperty, optional: bool) -> Expr {
    Expr::Member { object: Box::new(object), property, optional }
}

fn call(callee: Expr, arguments: Vec<Element>, optional: bool) -> Expr {
    Expr::Call { callee: Box::new(callee), arguments, optional }
}

fn update(operator: UpdateOp, prefix: bool, target: Expr) -> Result<Expr, ParseError> {
    if !target.is_assignable() {
        return Err(ParseError::new("Invalid update target", Default::default()));
    }
    Ok(Expr::Update { operator, prefix, target: Box::new(target) })
}

/// Parse an expression source string
pub fn parse_expression(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Expr {
        Expr::Identifier(name.into())
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Literal::Number(n))
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(expr, binary(BinaryOp::Add, num(1.0), binary(BinaryOp::Mul, num(2.0), num(3.0))));
    }

    #[test]
    fn test_exponent_right_associative() {
        let expr = parse_expression("2 ** 3 ** 2").unwrap();
        assert_eq!(expr, binary(BinaryOp::Pow, num(2.0), binary(BinaryOp::Pow, num(3.0), num(2.0))));
    }

    #[test]
    fn test_arrow_functions() {
        let Expr::Arrow(arrow) = parse_expression("(a, b) => a + b").unwrap() else {
            panic!("expected arrow");
        };
        let expected: Vec<Box<str>> = vec!["a".into(), "b".into()];
        assert_eq!(arrow.params, expected);

        let Expr::Arrow(arrow) = parse_expression("x => x.done").unwrap() else {
            panic!("expected arrow");
        };
        assert_eq!(arrow.params.len(), 1);

        assert!(matches!(parse_expression("() => 1").unwrap(), Expr::Arrow(_)));
        // parenthesized expression is not an arrow
        assert_eq!(parse_expression("(a)").unwrap(), ident("a"));
    }

    #[test]
    fn test_optional_chaining() {
        let expr = parse_expression("a?.b").unwrap();
        assert_eq!(expr, member(ident("a"), MemberProperty::Name("b".into()), true));
        assert!(matches!(parse_expression("f?.(1)").unwrap(), Expr::Call { optional: true, .. }));
    }

    #[test]
    fn test_object_literal() {
        let expr = parse_expression("{ a: 1, b, 'c d': 2, [k]: 3, ...rest }").unwrap();
        let Expr::Object(props) = expr else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 5);
        assert_eq!(props[1], Property::KeyValue {
            key: PropertyKey::Static("b".into()),
            value: ident("b"),
        });
        assert!(matches!(props[4], Property::Spread(_)));
    }

    #[test]
    fn test_assignment_targets() {
        assert!(parse_expression("state.count = state.count + 1").is_ok());
        assert!(parse_expression("state.items[0] += 1").is_ok());
        assert!(parse_expression("count++").is_ok());
        assert!(parse_expression("1 = 2").is_err());
        assert!(parse_expression("a?.b = 1").is_err());
        assert!(parse_expression("f()++").is_err());
    }

    #[test]
    fn test_template_literal() {
        let expr = parse_expression("`n=${count + 1}`").unwrap();
        assert_eq!(expr, Expr::Template(vec![
            TemplateSegment::Str("n=".into()),
            TemplateSegment::Expr(binary(BinaryOp::Add, ident("count"), num(1.0))),
        ]));
    }

    #[test]
    fn test_errors() {
        assert!(parse_expression("").is_err());
        assert!(parse_expression("a +").is_err());
        assert!(parse_expression("a b").is_err());
        assert!(parse_expression("(a").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let err = parse_expression(&deep).unwrap_err();
        assert!(err.message.contains("nested too deeply"));

        assert!(parse_expression(&"!".repeat(10_000)).is_err());
        assert!(parse_expression(&format!("{}1{}", "[".repeat(10_000), "]".repeat(10_000))).is_err());
        assert!(parse_expression(&vec!["2"; 10_000].join(" ** ")).is_err());

        let fine = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_expression(&fine).unwrap(), num(1.0));
    }
}
