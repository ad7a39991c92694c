use crate::ast::{BinaryOp, Expr, ExprKind, Literal, MapEntry, UnaryOp};
use crate::errors::{ParseErrorKind, Result};
use crate::span::{Span, Spanned};
use crate::token::{Keyword, TokenKind};

use super::Parser;

/// Binding power of prefix operators; postfix operators bind tighter still
/// and are applied directly to the primary they follow.
const PREFIX_BP: u8 = 15;

enum Infix {
    Binary(BinaryOp),
    Is,
}

/// Left and right binding powers of infix operators. Equal left powers
/// with a higher right power give left associativity.
fn infix(kind: &TokenKind) -> Option<(u8, u8, Infix)> {
    let (l_bp, r_bp, op) = match kind {
        TokenKind::OrOr => (3, 4, BinaryOp::Or),
        TokenKind::AndAnd => (5, 6, BinaryOp::And),
        TokenKind::EqEq => (7, 8, BinaryOp::Eq),
        TokenKind::BangEq => (7, 8, BinaryOp::NotEq),
        TokenKind::Lt => (9, 10, BinaryOp::Lt),
        TokenKind::LtEq => (9, 10, BinaryOp::LtEq),
        TokenKind::GtEq => (9, 10, BinaryOp::GtEq),
        TokenKind::Gt => (9, 10, BinaryOp::Gt),
        TokenKind::Keyword(Keyword::In) => (9, 10, BinaryOp::In),
        TokenKind::Keyword(Keyword::Is) => return Some((9, 10, Infix::Is)),
        TokenKind::Plus => (11, 12, BinaryOp::Add),
        TokenKind::Minus => (11, 12, BinaryOp::Sub),
        TokenKind::Star => (13, 14, BinaryOp::Mul),
        TokenKind::Slash => (13, 14, BinaryOp::Div),
        TokenKind::Percent => (13, 14, BinaryOp::Rem),
        _ => return None,
    };
    Some((l_bp, r_bp, Infix::Binary(op)))
}

fn unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    let op = match kind {
        TokenKind::Bang => UnaryOp::Not,
        TokenKind::Minus => UnaryOp::Negate,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Tilde => UnaryOp::BitNot,
        _ => return None,
    };
    Some(op)
}

impl Parser<'_> {
    /// `expression → binary ( "?" expression ":" expression )?`
    pub(crate) fn expression(&mut self) -> Result<Expr> {
        let condition = self.pratt_expr(0)?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(condition);
        }

        let then_branch = self.nested(Self::expression)?;
        self.expect(&TokenKind::Colon)?;
        let else_branch = self.nested(Self::expression)?;

        let span = condition.span.merge(else_branch.span);
        Ok(Spanned::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn pratt_expr(&mut self, min_bp: u8) -> Result<Expr> {
        self.nested(|p| p.pratt_loop(min_bp))
    }

    fn pratt_loop(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.prefix()?;

        loop {
            let (l_bp, r_bp, op) = match infix(&self.peek_kind()?) {
                Some(infix) => infix,
                None => break,
            };
            if l_bp < min_bp {
                break;
            }
            self.advance()?;

            lhs = match op {
                Infix::Is => self.typecheck(lhs)?,
                Infix::Binary(op) => {
                    let rhs = self.pratt_expr(r_bp)?;
                    Expr::binary(op, lhs, rhs)
                }
            };
        }

        Ok(lhs)
    }

    /// The right side of `is` is a bare type name, never an expression.
    fn typecheck(&mut self, expr: Expr) -> Result<Expr> {
        let type_name = self.expect_ident("type name")?;
        if matches!(
            self.peek_kind()?,
            TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen
        ) {
            return Err(self.unexpected("end of type name"));
        }

        let span = expr.span.merge(type_name.span);
        Ok(Spanned::new(
            ExprKind::Typecheck {
                expr: Box::new(expr),
                type_name,
            },
            span,
        ))
    }

    fn prefix(&mut self) -> Result<Expr> {
        let token = self.peek()?.clone();
        let Some(op) = unary_op(&token.kind) else {
            let primary = self.primary()?;
            return self.postfix(primary);
        };

        self.advance()?;
        if op == UnaryOp::Negate {
            if let Some(min) = self.negated_min(token.span)? {
                return self.postfix(min);
            }
        }
        let operand = self.pratt_expr(PREFIX_BP)?;
        let span = token.span.merge(operand.span);
        Ok(Spanned::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `-9223372036854775808` is the one integer whose magnitude does not fit
    /// in `i64`, so it folds into a literal right after its minus.
    fn negated_min(&mut self, minus: Span) -> Result<Option<Expr>> {
        if self.peek_kind()? != TokenKind::Int(i64::MIN.unsigned_abs()) {
            return Ok(None);
        }
        let token = self.advance()?;
        Ok(Some(Expr::literal(
            Literal::Int(i64::MIN),
            minus.merge(token.span),
        )))
    }

    /// Member access, subscripts and calls, chained left to right.
    fn postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            match self.peek_kind()? {
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.expect_ident("member name")?;
                    let member = Expr::ident(name.node, name.span);
                    expr = Expr::member(expr, member);
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.expression()?;
                    let close = self.expect(&TokenKind::RBracket)?;
                    let span = expr.span.merge(close.span);
                    expr = Spanned::new(
                        ExprKind::Subscript {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen => {
                    self.advance()?;
                    let args = self.arguments()?;
                    let span = self.span_from(expr.span);
                    expr = Spanned::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Comma separated arguments up to and including the closing `)`.
    fn arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen)? {
            loop {
                args.push(self.expression()?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek()?.clone();
        let literal = match token.kind {
            TokenKind::Int(value) => Literal::Int(i64::try_from(value).map_err(|_| {
                self.error(ParseErrorKind::IntegerOutOfRange(value), token.span)
            })?),
            TokenKind::Float(value) => Literal::Float(value),
            TokenKind::Str(value) => Literal::String(value),
            TokenKind::Keyword(Keyword::True) => Literal::Bool(true),
            TokenKind::Keyword(Keyword::False) => Literal::Bool(false),
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            TokenKind::Ident(_) | TokenKind::Keyword(_) => {
                let name = self.expect_ident("expression")?;
                return Ok(Expr::ident(name.node, name.span));
            }
            TokenKind::LParen => return self.parenthesized(),
            TokenKind::LBracket => return self.list(),
            TokenKind::LBrace => return self.map(),
            // a leading `/` is always a path, never division
            TokenKind::Slash => return self.path_literal(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance()?;
        Ok(Expr::literal(literal, token.span))
    }

    fn parenthesized(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LParen)?;
        let inner = self.expression()?;
        let close = self.expect(&TokenKind::RParen)?;
        Ok(Spanned::new(
            ExprKind::Parenthesized(Box::new(inner)),
            open.span.merge(close.span),
        ))
    }

    /// `[a, b,, c,]`: an element left out between two commas becomes
    /// `Missing`; a single trailing comma adds nothing.
    fn list(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();

        if !self.check(&TokenKind::RBracket)? {
            elements.push(self.expression()?);
            while self.eat(&TokenKind::Comma)? {
                let next = self.peek()?.clone();
                match next.kind {
                    TokenKind::RBracket => break,
                    TokenKind::Comma => {
                        elements.push(Spanned::new(
                            ExprKind::Missing,
                            Span::point(next.span.start),
                        ));
                    }
                    _ => elements.push(self.expression()?),
                }
            }
        }

        let close = self.expect(&TokenKind::RBracket)?;
        Ok(Expr::literal(
            Literal::List(elements),
            open.span.merge(close.span),
        ))
    }

    /// `{'key': value, ...}`; keys are string literals, empty entries between
    /// commas are skipped.
    fn map(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBrace)?;
        let mut entries = Vec::new();

        if !self.check(&TokenKind::RBrace)? {
            entries.push(self.map_entry()?);
            while self.eat(&TokenKind::Comma)? {
                match self.peek_kind()? {
                    TokenKind::RBrace => break,
                    TokenKind::Comma => continue,
                    _ => entries.push(self.map_entry()?),
                }
            }
        }

        let close = self.expect(&TokenKind::RBrace)?;
        Ok(Expr::literal(
            Literal::Map(entries),
            open.span.merge(close.span),
        ))
    }

    fn map_entry(&mut self) -> Result<MapEntry> {
        let key = match self.peek_kind()? {
            TokenKind::Str(key) => {
                let token = self.advance()?;
                Spanned::new(key, token.span)
            }
            _ => return Err(self.unexpected("string map key")),
        };
        self.expect(&TokenKind::Colon)?;
        let value = self.expression()?;
        Ok(MapEntry { key, value })
    }
}
