use std::rc::Rc;

use super::markup::Markup;
use super::span::Spanned;
use super::value::Value;

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Literal value: "hello", 42, true, null, undefined
    Literal(Value),

    /// Identifier: a lexical binding or an interpolation placeholder.
    Ident(String),

    /// Array literal: [1, ...rest]
    Array(Vec<ArrayItem>),

    /// Object literal: { a: 1, b, ...rest }
    Object(Vec<ObjectProp>),

    /// Property access: a.b, a?.b
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },

    /// Computed access: a[b]
    Index { object: Box<Expr>, index: Box<Expr> },

    /// Call: f(a, b), items.map(f)
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Unary operation: !a, -a, +a
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation, including the short-circuiting `&&`, `||`, `??`.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// test ? consequent : alternate
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },

    /// (a, b) => body
    ///
    /// Shared so the closure built at evaluation time can hold on to
    /// the body without cloning the tree.
    Arrow { params: Rc<[String]>, body: Rc<Expr> },

    /// Nested markup used as a value: cond && <b>yes</b>
    Markup(Box<Markup>),
}

#[derive(Debug, Clone)]
pub enum ArrayItem {
    Item(Expr),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum ObjectProp {
    KeyValue(String, Expr),
    Shorthand(Spanned<String>),
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Equality
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,

    // Relational
    Lt,
    Gt,
    LtEq,
    GtEq,

    // Logical
    And,
    Or,
    Nullish,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or | BinOp::Nullish)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}
