//! Abstract Syntax Tree
//!
//! Expression tree produced by the parser. Arrow function bodies are
//! reference counted so a closure value can hold on to its body.

use std::rc::Rc;

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Template(Vec<TemplateSegment>),
    Identifier(Box<str>),
    Array(Vec<Element>),
    Object(Vec<Property>),
    Member {
        object: Box<Expr>,
        property: MemberProperty,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Element>,
        optional: bool,
    },
    Unary {
        operator: UnaryOp,
        argument: Box<Expr>,
    },
    Update {
        operator: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        operator: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        operator: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Arrow(Rc<Arrow>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Box<str>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Str(String),
    Expr(Expr),
}

/// Array element or call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Item(Expr),
    Spread(Expr),
}

/// Object literal member
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue { key: PropertyKey, value: Expr },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Static(Box<str>),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Name(Box<str>),
    Computed(Box<Expr>),
}

/// Arrow function
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub params: Vec<Box<str>>,
    pub body: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp { Minus, Plus, Not, Typeof }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp { Increment, Decrement }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add, Sub, Mul, Div, Mod, Pow,
    LessThan, LessThanEq, GreaterThan, GreaterThanEq,
    Equal, NotEqual, StrictEqual, StrictNotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp { And, Or, NullishCoalescing }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp { Assign, AddAssign, SubAssign }

impl Expr {
    /// Whether the expression is a binding or a plain member path rooted at one
    pub fn is_assignable(&self) -> bool {
        match self {
            Expr::Identifier(_) => true,
            Expr::Member { optional, object, .. } => !optional && object.is_assignable(),
            _ => false,
        }
    }
}
