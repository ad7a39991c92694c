//! Syntax tree produced by the parser.
//!
//! Every node is wrapped in [`Spanned`] and owns its children. The tree is
//! never mutated after parsing; consumers (evaluators, linters, formatters)
//! read it directly or walk it with [`crate::Visitor`].
mod expr;

pub use expr::{
    BinaryOp, Expr, ExprKind, Literal, MapEntry, PathLiteral, PathLiteralSegment, Precedence,
    UnaryOp,
};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::Spanned;

pub type Ident = Spanned<String>;

/// Root of a parsed rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub version: Option<Spanned<RulesVersion>>,
    pub services: Vec<Spanned<ServiceDeclaration>>,
}

/// `rules_version = '2';`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesVersion {
    pub version: String,
}

/// `service cloud.firestore { ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDeclaration {
    /// Unstructured name; any run of non-whitespace characters.
    pub name: Ident,
    pub body: Vec<ServiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ServiceItem {
    Function(Spanned<FunctionDeclaration>),
    Match(Spanned<MatchDeclaration>),
}

/// `match /path/{capture} { ... }`. The body is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDeclaration {
    pub path: Vec<Spanned<PathSegment>>,
    pub body: Vec<MatchItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MatchItem {
    Function(Spanned<FunctionDeclaration>),
    Match(Spanned<MatchDeclaration>),
    Allow(Spanned<AllowDeclaration>),
}

/// One `/`-delimited segment of a match path.
///
/// A `CaptureGroup` is only meaningful as the last segment; checking that is
/// left to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathSegment {
    /// `/users`
    Literal(String),
    /// `/{userId}`
    Capture(String),
    /// `/{rest=**}`
    CaptureGroup(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: Ident,
    /// Pairwise distinct.
    pub params: Vec<Ident>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionBody {
    pub lets: Vec<Spanned<LetDeclaration>>,
    pub ret: Spanned<ReturnStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetDeclaration {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub value: Expr,
}

/// `allow read, write: if <condition>;`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowDeclaration {
    /// In source order, duplicates kept.
    pub operations: Vec<Spanned<Operation>>,
    pub condition: Expr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Get,
    List,
    Write,
    Update,
    Delete,
    Create,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Write => "write",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Create => "create",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SourceFile {
    /// Version string of the `rules_version` statement, if present.
    pub fn rules_version(&self) -> Option<&str> {
        self.version.as_ref().map(|v| v.version.as_str())
    }
}

impl MatchDeclaration {
    pub fn allows(&self) -> impl Iterator<Item = &Spanned<AllowDeclaration>> {
        self.body.iter().filter_map(|item| match item {
            MatchItem::Allow(allow) => Some(allow),
            _ => None,
        })
    }

    pub fn matches(&self) -> impl Iterator<Item = &Spanned<MatchDeclaration>> {
        self.body.iter().filter_map(|item| match item {
            MatchItem::Match(m) => Some(m),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Spanned<FunctionDeclaration>> {
        self.body.iter().filter_map(|item| match item {
            MatchItem::Function(f) => Some(f),
            _ => None,
        })
    }
}
