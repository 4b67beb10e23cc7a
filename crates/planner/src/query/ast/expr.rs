//! Defines the AST for SQL expressions.

use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column or table identifier, e.g., `users` or `users.id`.
    Identifier(Ident),

    /// A bound parameter. Rendered as a placeholder, never inlined.
    Value(Value),

    /// A binary comparison, e.g., `column = ?` or `a like ?`.
    BinaryOp(Box<BinaryOp>),

    /// A function call, e.g., `count(*)`.
    FunctionCall(FunctionCall),

    /// An aliased expression, e.g. `count(*) as "cnt"`
    Alias { expr: Box<Expr>, alias: String },

    /// Text extraction from a JSON column, e.g. `"address"->>'city'`.
    JsonPath { column: Ident, path: Vec<String> },

    /// Conjunction without surrounding parentheses: `a and b`.
    And(Vec<Expr>),

    /// Disjunction without surrounding parentheses: `a or b`.
    Or(Vec<Expr>),

    /// `not (expr)`
    Not(Box<Expr>),

    /// `(expr)`
    Nested(Box<Expr>),

    /// `expr in (?, ?)` / `expr not in (?, ?)`
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// `expr between ? and ?`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// `expr is null` / `expr is not null`
    IsNull { expr: Box<Expr>, negated: bool },

    /// `*` or `"t".*`
    Wildcard { qualifier: Option<String> },
}

impl Expr {
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp(Box::new(BinaryOp { left, op, right }))
    }

    pub fn nested(self) -> Self {
        Expr::Nested(Box::new(self))
    }

    /// Joins conditions with `and`, collapsing the trivial cases.
    pub fn conjunction(mut exprs: Vec<Expr>) -> Option<Self> {
        match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub qualifier: Option<String>, // e.g., the 'users' in 'users.id'
    pub name: String,              // e.g., the 'id' in 'users.id'
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub wildcard: bool, // represents the '*' in 'COUNT(*)'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    LtEq,  // <=
    Gt,    // >
    GtEq,  // >=

    // Pattern matching
    Like,
    NotLike,
    ILike,
    NotILike,
}
