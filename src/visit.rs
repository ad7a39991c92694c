//! Read-only traversal of the syntax tree.
//!
//! Implement [`Visitor`] and override the hooks of interest. Each default
//! hook calls the matching `walk_*` function, which visits the children in
//! source order; an override that does not call `walk_*` skips the subtree.
use crate::ast::{
    AllowDeclaration, Expr, ExprKind, FunctionDeclaration, LetDeclaration, Literal,
    MatchDeclaration, MatchItem, PathLiteral, PathLiteralSegment, PathSegment, ReturnStatement,
    ServiceDeclaration, ServiceItem, SourceFile,
};
use crate::span::Spanned;

pub trait Visitor {
    fn visit_source_file(&mut self, file: &SourceFile) {
        walk_source_file(self, file);
    }

    fn visit_service(&mut self, service: &Spanned<ServiceDeclaration>) {
        walk_service(self, service);
    }

    fn visit_match(&mut self, m: &Spanned<MatchDeclaration>) {
        walk_match(self, m);
    }

    fn visit_path_segment(&mut self, _segment: &Spanned<PathSegment>) {}

    fn visit_function(&mut self, function: &Spanned<FunctionDeclaration>) {
        walk_function(self, function);
    }

    fn visit_let(&mut self, binding: &Spanned<LetDeclaration>) {
        self.visit_expr(&binding.value);
    }

    fn visit_return(&mut self, ret: &Spanned<ReturnStatement>) {
        self.visit_expr(&ret.value);
    }

    fn visit_allow(&mut self, allow: &Spanned<AllowDeclaration>) {
        self.visit_expr(&allow.condition);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    fn visit_path_literal(&mut self, path: &PathLiteral) {
        walk_path_literal(self, path);
    }
}

pub fn walk_source_file<V: Visitor + ?Sized>(visitor: &mut V, file: &SourceFile) {
    for service in &file.services {
        visitor.visit_service(service);
    }
}

pub fn walk_service<V: Visitor + ?Sized>(visitor: &mut V, service: &Spanned<ServiceDeclaration>) {
    for item in &service.body {
        match item {
            ServiceItem::Function(function) => visitor.visit_function(function),
            ServiceItem::Match(m) => visitor.visit_match(m),
        }
    }
}

pub fn walk_match<V: Visitor + ?Sized>(visitor: &mut V, m: &Spanned<MatchDeclaration>) {
    for segment in &m.path {
        visitor.visit_path_segment(segment);
    }
    for item in &m.body {
        match item {
            MatchItem::Function(function) => visitor.visit_function(function),
            MatchItem::Match(inner) => visitor.visit_match(inner),
            MatchItem::Allow(allow) => visitor.visit_allow(allow),
        }
    }
}

pub fn walk_function<V: Visitor + ?Sized>(
    visitor: &mut V,
    function: &Spanned<FunctionDeclaration>,
) {
    for binding in &function.body.lets {
        visitor.visit_let(binding);
    }
    visitor.visit_return(&function.body.ret);
}

pub fn walk_expr<V: Visitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.node {
        ExprKind::Literal(literal) => match literal {
            Literal::List(elements) => {
                for element in elements {
                    visitor.visit_expr(element);
                }
            }
            Literal::Map(entries) => {
                for entry in entries {
                    visitor.visit_expr(&entry.value);
                }
            }
            Literal::Path(path) => visitor.visit_path_literal(path),
            _ => {}
        },
        ExprKind::Identifier(_) | ExprKind::Missing => {}
        ExprKind::Unary { operand, .. } => visitor.visit_expr(operand),
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Ternary {
            condition,
            then_branch,
            else_branch,
        } => {
            visitor.visit_expr(condition);
            visitor.visit_expr(then_branch);
            visitor.visit_expr(else_branch);
        }
        ExprKind::Typecheck { expr, .. } => visitor.visit_expr(expr),
        ExprKind::Member { object, member } => {
            visitor.visit_expr(object);
            visitor.visit_expr(member);
        }
        ExprKind::Subscript { object, index } => {
            visitor.visit_expr(object);
            visitor.visit_expr(index);
        }
        ExprKind::Call { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Parenthesized(inner) => visitor.visit_expr(inner),
    }
}

pub fn walk_path_literal<V: Visitor + ?Sized>(visitor: &mut V, path: &PathLiteral) {
    for segment in &path.segments {
        if let PathLiteralSegment::Reference(expr) = &segment.node {
            visitor.visit_expr(expr);
        }
    }
}
