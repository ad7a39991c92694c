//! Canonical source rendering.
//!
//! Every node implements [`fmt::Display`]. The output parses back into an
//! equal tree: parentheses present in the source are kept as
//! `Parenthesized` nodes, and parentheses are only added around operands
//! whose precedence would otherwise change the shape.
use std::fmt::{self, Display, Formatter};

use crate::ast::{
    AllowDeclaration, BinaryOp, Expr, ExprKind, FunctionDeclaration, Literal, MatchDeclaration,
    MatchItem, PathLiteral, PathLiteralSegment, PathSegment, Precedence, ServiceDeclaration,
    ServiceItem, SourceFile, UnaryOp,
};
use crate::span::Spanned;

const INDENT: &str = "  ";

struct Indent(usize);

impl Display for Indent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for _ in 0..self.0 {
            f.write_str(INDENT)?;
        }
        Ok(())
    }
}

/// Writes `value` as a single-quoted string literal.
struct Quoted<'a>(&'a str);

impl Display for Quoted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("'")?;
        for c in self.0.chars() {
            match c {
                '\\' => f.write_str("\\\\")?,
                '\'' => f.write_str("\\'")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                '\r' => f.write_str("\\r")?,
                c => write!(f, "{}", c)?,
            }
        }
        f.write_str("'")
    }
}

impl<T: Display> Display for Spanned<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.node.fmt(f)
    }
}

impl Display for SourceFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(version) = &self.version {
            writeln!(f, "rules_version = {};", Quoted(&version.version))?;
        }
        for service in &self.services {
            service.fmt(f)?;
        }
        Ok(())
    }
}

impl Display for ServiceDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "service {} {{", self.name)?;
        for item in &self.body {
            match item {
                ServiceItem::Function(function) => write_function(f, function, 1)?,
                ServiceItem::Match(m) => write_match(f, m, 1)?,
            }
        }
        writeln!(f, "}}")
    }
}

impl Display for MatchDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_match(f, self, 0)
    }
}

impl Display for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_function(f, self, 0)
    }
}

impl Display for AllowDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("allow ")?;
        for (i, operation) in self.operations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            operation.fmt(f)?;
        }
        write!(f, ": if {};", self.condition)
    }
}

fn write_match(f: &mut Formatter<'_>, m: &MatchDeclaration, level: usize) -> fmt::Result {
    write!(f, "{}match ", Indent(level))?;
    for segment in &m.path {
        segment.fmt(f)?;
    }
    f.write_str(" {\n")?;
    for item in &m.body {
        match item {
            MatchItem::Function(function) => write_function(f, function, level + 1)?,
            MatchItem::Match(inner) => write_match(f, inner, level + 1)?,
            MatchItem::Allow(allow) => writeln!(f, "{}{}", Indent(level + 1), allow)?,
        }
    }
    writeln!(f, "{}}}", Indent(level))
}

fn write_function(
    f: &mut Formatter<'_>,
    function: &FunctionDeclaration,
    level: usize,
) -> fmt::Result {
    write!(f, "{}function {}(", Indent(level), function.name)?;
    for (i, param) in function.params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        param.fmt(f)?;
    }
    f.write_str(") {\n")?;
    for binding in &function.body.lets {
        writeln!(
            f,
            "{}let {} = {};",
            Indent(level + 1),
            binding.name,
            binding.value
        )?;
    }
    writeln!(f, "{}return {};", Indent(level + 1), function.body.ret.value)?;
    writeln!(f, "{}}}", Indent(level))
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal(text) => write!(f, "/{}", text),
            PathSegment::Capture(name) => write!(f, "/{{{}}}", name),
            PathSegment::CaptureGroup(name) => write!(f, "/{{{}=**}}", name),
        }
    }
}

impl Display for PathLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match &segment.node {
                PathLiteralSegment::Literal(text) => write!(f, "/{}", text)?,
                PathLiteralSegment::Bind(name) => write!(f, "/{{{}}}", name)?,
                PathLiteralSegment::Reference(expr) => write!(f, "/$({})", expr)?,
            }
        }
        Ok(())
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(value) => Quoted(value).fmt(f),
            Literal::Int(value) => write!(f, "{}", value),
            Literal::Float(value) => {
                let text = value.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            Literal::Bool(value) => write!(f, "{}", value),
            Literal::Null => f.write_str("null"),
            Literal::List(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    element.fmt(f)?;
                }
                // `[a,,]` needs the extra comma to keep its trailing hole
                if matches!(elements.last(), Some(e) if e.node == ExprKind::Missing) {
                    f.write_str(",")?;
                }
                f.write_str("]")
            }
            Literal::Map(entries) => {
                f.write_str("{")?;
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", Quoted(&entry.key), entry.value)?;
                }
                f.write_str("}")
            }
            Literal::Path(path) => path.fmt(f),
        }
    }
}

/// Writes `expr`, parenthesized when `wrap` holds for its precedence.
fn operand(f: &mut Formatter<'_>, expr: &Expr, wrap: impl Fn(Precedence) -> bool) -> fmt::Result {
    if wrap(expr.precedence()) {
        write!(f, "({})", expr)
    } else {
        expr.fmt(f)
    }
}

impl Display for ExprKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Literal(literal) => literal.fmt(f),
            ExprKind::Identifier(name) => f.write_str(name),
            ExprKind::Unary { op, operand: inner } => {
                op.fmt(f)?;
                operand(f, inner, |p| p < Precedence::Prefix)
            }
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                // a type name closes the typecheck, so `x is int + 1` is unambiguous
                if matches!(left.node, ExprKind::Typecheck { .. }) {
                    left.fmt(f)?;
                } else {
                    operand(f, left, |p| p < prec)?;
                }
                write!(f, " {} ", op)?;
                operand(f, right, |p| p <= prec)
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                operand(f, condition, |p| p <= Precedence::Ternary)?;
                write!(f, " ? {} : {}", then_branch, else_branch)
            }
            ExprKind::Typecheck { expr, type_name } => {
                operand(f, expr, |p| p < Precedence::Relational)?;
                write!(f, " is {}", type_name)
            }
            ExprKind::Member { object, member } => {
                operand(f, object, |p| p < Precedence::Postfix)?;
                // `1.x` would scan as a float and `/a/b.x` as one segment
                if matches!(
                    object.node,
                    ExprKind::Literal(Literal::Int(_)) | ExprKind::Literal(Literal::Path(_))
                ) {
                    f.write_str(" ")?;
                }
                write!(f, ".{}", member)
            }
            ExprKind::Subscript { object, index } => {
                operand(f, object, |p| p < Precedence::Postfix)?;
                write!(f, "[{}]", index)
            }
            ExprKind::Call { callee, args } => {
                operand(f, callee, |p| p < Precedence::Postfix)?;
                f.write_str("(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    arg.fmt(f)?;
                }
                f.write_str(")")
            }
            ExprKind::Parenthesized(inner) => write!(f, "({})", inner),
            ExprKind::Missing => Ok(()),
        }
    }
}
