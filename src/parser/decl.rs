use tracing::trace;

use crate::ast::{
    AllowDeclaration, FunctionBody, FunctionDeclaration, Ident, LetDeclaration,
    MatchDeclaration, MatchItem, Operation, ReturnStatement, RulesVersion, ServiceDeclaration,
    ServiceItem, SourceFile,
};
use crate::errors::{ParseErrorKind, Result};
use crate::span::Spanned;
use crate::token::{Keyword, TokenKind};

use super::Parser;

impl Parser<'_> {
    /// `source_file → rules_version? service*`
    pub(crate) fn source_file(&mut self) -> Result<SourceFile> {
        let version = if self.check_keyword(Keyword::RulesVersion)? {
            Some(self.rules_version()?)
        } else {
            None
        };

        let mut services = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Service) => services.push(self.service()?),
                _ => return Err(self.unexpected("`service` declaration")),
            }
        }

        Ok(SourceFile { version, services })
    }

    fn rules_version(&mut self) -> Result<Spanned<RulesVersion>> {
        let start = self.expect_keyword(Keyword::RulesVersion)?.span;
        self.expect(&TokenKind::Assign)?;
        let version = match self.peek_kind()? {
            TokenKind::Str(version) => {
                self.advance()?;
                version
            }
            _ => return Err(self.unexpected("version string")),
        };
        self.eat(&TokenKind::Semicolon)?;

        trace!(%version, "rules version");
        Ok(Spanned::new(RulesVersion { version }, self.span_from(start)))
    }

    fn service(&mut self) -> Result<Spanned<ServiceDeclaration>> {
        let start = self.expect_keyword(Keyword::Service)?.span;
        let name = self.service_name()?;
        self.expect(&TokenKind::LBrace)?;

        let mut body = Vec::new();
        loop {
            match self.peek_kind()? {
                TokenKind::Keyword(Keyword::Function) => {
                    body.push(ServiceItem::Function(self.function()?));
                }
                TokenKind::Keyword(Keyword::Match) => {
                    body.push(ServiceItem::Match(self.match_declaration()?));
                }
                TokenKind::RBrace => break,
                _ => return Err(self.unexpected("`function`, `match` or `}`")),
            }
        }
        self.expect(&TokenKind::RBrace)?;

        trace!(name = %name.node, items = body.len(), "parsed service");
        Ok(Spanned::new(
            ServiceDeclaration { name, body },
            self.span_from(start),
        ))
    }

    /// Service names are free-form (`cloud.firestore`, `firebase.storage`)
    /// and scanned as one run of characters up to whitespace or `{`.
    fn service_name(&mut self) -> Result<Ident> {
        if self.peeked.is_none() {
            if let Some(token) = self.lexer.scan_service_name()? {
                if let TokenKind::ServiceName(name) = token.kind {
                    self.prev_end = token.span.end;
                    return Ok(Spanned::new(name, token.span));
                }
            }
        }
        Err(self.unexpected("service name"))
    }

    pub(crate) fn match_declaration(&mut self) -> Result<Spanned<MatchDeclaration>> {
        self.nested(|p| {
            let start = p.expect_keyword(Keyword::Match)?.span;
            let path = p.match_path()?;
            let open = p.expect(&TokenKind::LBrace)?.span;

            let mut body = Vec::new();
            loop {
                match p.peek_kind()? {
                    TokenKind::Keyword(Keyword::Function) => {
                        body.push(MatchItem::Function(p.function()?));
                    }
                    TokenKind::Keyword(Keyword::Match) => {
                        body.push(MatchItem::Match(p.match_declaration()?));
                    }
                    TokenKind::Keyword(Keyword::Allow) => {
                        body.push(MatchItem::Allow(p.allow()?));
                    }
                    TokenKind::RBrace => break,
                    _ => return Err(p.unexpected("`function`, `match`, `allow` or `}`")),
                }
            }
            p.expect(&TokenKind::RBrace)?;

            if body.is_empty() {
                return Err(p.error(ParseErrorKind::EmptyMatchBody, p.span_from(open)));
            }

            trace!(segments = path.len(), items = body.len(), "parsed match");
            Ok(Spanned::new(
                MatchDeclaration { path, body },
                p.span_from(start),
            ))
        })
    }

    /// `function → "function" name "(" params ")" "{" let* return "}"`
    fn function(&mut self) -> Result<Spanned<FunctionDeclaration>> {
        let start = self.expect_keyword(Keyword::Function)?.span;
        let name = self.expect_ident("function name")?;

        self.expect(&TokenKind::LParen)?;
        let mut params: Vec<Ident> = Vec::new();
        if !self.check(&TokenKind::RParen)? {
            loop {
                let param = self.expect_ident("parameter name")?;
                if params.iter().any(|p| p.node == param.node) {
                    return Err(self.error(
                        ParseErrorKind::DuplicateParameter(param.node),
                        param.span,
                    ));
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;

        self.expect(&TokenKind::LBrace)?;
        let body = self.function_body()?;
        self.expect(&TokenKind::RBrace)?;

        trace!(name = %name.node, params = params.len(), "parsed function");
        Ok(Spanned::new(
            FunctionDeclaration { name, params, body },
            self.span_from(start),
        ))
    }

    fn function_body(&mut self) -> Result<FunctionBody> {
        let mut lets = Vec::new();
        while self.check_keyword(Keyword::Let)? {
            lets.push(self.let_declaration()?);
        }

        if self.check(&TokenKind::RBrace)? {
            let span = self.peek()?.span;
            return Err(self.error(ParseErrorKind::MissingReturn, span));
        }
        if !self.check_keyword(Keyword::Return)? {
            return Err(self.unexpected("`let` or `return`"));
        }
        let ret = self.return_statement()?;

        Ok(FunctionBody { lets, ret })
    }

    fn let_declaration(&mut self) -> Result<Spanned<LetDeclaration>> {
        let start = self.expect_keyword(Keyword::Let)?.span;
        let name = self.expect_ident("variable name")?;
        self.expect(&TokenKind::Assign)?;
        let value = self.expression()?;
        self.eat(&TokenKind::Semicolon)?;

        Ok(Spanned::new(
            LetDeclaration { name, value },
            self.span_from(start),
        ))
    }

    fn return_statement(&mut self) -> Result<Spanned<ReturnStatement>> {
        let start = self.expect_keyword(Keyword::Return)?.span;
        let value = self.expression()?;
        self.eat(&TokenKind::Semicolon)?;

        Ok(Spanned::new(ReturnStatement { value }, self.span_from(start)))
    }

    /// `allow → "allow" operation ("," operation)* ":" "if" expression ";"?`
    fn allow(&mut self) -> Result<Spanned<AllowDeclaration>> {
        let start = self.expect_keyword(Keyword::Allow)?.span;

        let mut operations = vec![self.operation()?];
        while self.eat(&TokenKind::Comma)? {
            operations.push(self.operation()?);
        }

        self.expect(&TokenKind::Colon)?;
        self.expect_keyword(Keyword::If)?;
        let condition = self.expression()?;
        self.eat(&TokenKind::Semicolon)?;

        Ok(Spanned::new(
            AllowDeclaration {
                operations,
                condition,
            },
            self.span_from(start),
        ))
    }

    fn operation(&mut self) -> Result<Spanned<Operation>> {
        let operation = match self.peek_kind()? {
            TokenKind::Keyword(Keyword::Read) => Operation::Read,
            TokenKind::Keyword(Keyword::Get) => Operation::Get,
            TokenKind::Keyword(Keyword::List) => Operation::List,
            TokenKind::Keyword(Keyword::Write) => Operation::Write,
            TokenKind::Keyword(Keyword::Update) => Operation::Update,
            TokenKind::Keyword(Keyword::Delete) => Operation::Delete,
            TokenKind::Keyword(Keyword::Create) => Operation::Create,
            _ => return Err(self.unexpected("operation")),
        };
        let token = self.advance()?;
        Ok(Spanned::new(operation, token.span))
    }
}
