use serde::{Deserialize, Serialize};

use crate::span::{Span, Spanned};

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ExprKind {
    Literal(Literal),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    /// `expr is type_name`.
    Typecheck {
        expr: Box<Expr>,
        type_name: Spanned<String>,
    },
    /// `object.member`; the parser always places an `Identifier` in `member`.
    Member {
        object: Box<Expr>,
        member: Box<Expr>,
    },
    Subscript {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Parenthesized(Box<Expr>),
    /// Slot of an element omitted between two commas of a list, as in `[1,,2]`.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    Path(PathLiteral),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Spanned<String>,
    pub value: Expr,
}

/// A path value such as `/databases/$(database)/documents/users/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLiteral {
    pub segments: Vec<Spanned<PathLiteralSegment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathLiteralSegment {
    Literal(String),
    /// `/{name}`
    Bind(String),
    /// `/$(expr)`, evaluated to one path component at runtime.
    Reference(Box<Expr>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    GtEq,
    Gt,
    /// `left in right`: `left` is an element (or key) of `right`.
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::Gt => ">",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    pub fn precedence(self) -> Precedence {
        match self {
            BinaryOp::Or => Precedence::Or,
            BinaryOp::And => Precedence::And,
            BinaryOp::Eq | BinaryOp::NotEq => Precedence::Equality,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::GtEq | BinaryOp::Gt | BinaryOp::In => {
                Precedence::Relational
            }
            BinaryOp::Add | BinaryOp::Sub => Precedence::Additive,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => Precedence::Multiplicative,
        }
    }
}

/// Binding strength, loosest first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Ternary,
    Or,
    And,
    Equality,
    Relational,
    Additive,
    Multiplicative,
    Prefix,
    Postfix,
    Primary,
}

impl ExprKind {
    /// How tightly this node binds when printed without parentheses.
    pub fn precedence(&self) -> Precedence {
        match self {
            ExprKind::Ternary { .. } => Precedence::Ternary,
            ExprKind::Binary { op, .. } => op.precedence(),
            ExprKind::Typecheck { .. } => Precedence::Relational,
            ExprKind::Unary { .. } => Precedence::Prefix,
            ExprKind::Member { .. } | ExprKind::Subscript { .. } | ExprKind::Call { .. } => {
                Precedence::Postfix
            }
            ExprKind::Literal(_)
            | ExprKind::Identifier(_)
            | ExprKind::Parenthesized(_)
            | ExprKind::Missing => Precedence::Primary,
        }
    }
}

/// Shorthand constructors, mostly useful for building expected trees.
impl Expr {
    pub fn ident(name: impl Into<String>, span: Span) -> Expr {
        Spanned::new(ExprKind::Identifier(name.into()), span)
    }

    pub fn literal(literal: Literal, span: Span) -> Expr {
        Spanned::new(ExprKind::Literal(literal), span)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Spanned::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn member(object: Expr, member: Expr) -> Expr {
        let span = object.span.merge(member.span);
        Spanned::new(
            ExprKind::Member {
                object: Box::new(object),
                member: Box::new(member),
            },
            span,
        )
    }
}
