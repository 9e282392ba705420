// fun_project_root/fun_core/src/ast.rs
use std::sync::Arc;

// Boxed children keep Expression a fixed, small size.

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Placeholder, // $_, the value the compiled function is called with
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Boolean(bool),
    Null,
    Negate(Box<Expression>),
    Binary(Box<BinaryNode>),
    Index(Box<IndexNode>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Modulo,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub op: BinaryOp,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexNode {
    pub target: Expression,
    pub key: Expression,
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary(Box::new(BinaryNode { op, left, right }))
    }

    pub fn index(target: Expression, key: Expression) -> Expression {
        Expression::Index(Box::new(IndexNode { target, key }))
    }
}
