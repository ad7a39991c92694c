//! Recursive-descent parser over the lazy token stream.
//!
//! The grammar is split across `decl` (declarations), `expr` (precedence
//! climbing for expressions) and `path` (the two path sub-grammars). All of
//! them share the cursor helpers defined here.
mod builder;
mod decl;
mod expr;
mod path;

pub use builder::{ParserBuilder, Rules, DEFAULT_MAX_DEPTH};

use crate::ast::Ident;
use crate::errors::{Error, ParseError, ParseErrorKind, Result};
use crate::lexer::{Comment, Lexer};
use crate::span::{Span, Spanned};
use crate::token::{Keyword, Token, TokenKind};

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    /// One token of lookahead. While it is filled the lexer cursor sits
    /// exactly at its end.
    peeked: Option<Token>,
    prev_end: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str, max_depth: usize) -> Self {
        Self {
            lexer: Lexer::new(source),
            peeked: None,
            prev_end: 0,
            depth: 0,
            max_depth,
        }
    }

    pub(crate) fn into_comments(self) -> Vec<Comment> {
        self.lexer.into_comments()
    }

    /// Fails unless the whole input has been consumed.
    pub(crate) fn expect_end(&mut self) -> Result<()> {
        self.expect(&TokenKind::Eof).map(|_| ())
    }

    fn peek(&mut self) -> Result<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn peek_kind(&mut self) -> Result<TokenKind> {
        Ok(self.peek()?.kind.clone())
    }

    fn advance(&mut self) -> Result<Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        self.prev_end = token.span.end;
        Ok(token)
    }

    fn check(&mut self, kind: &TokenKind) -> Result<bool> {
        Ok(&self.peek()?.kind == kind)
    }

    fn check_keyword(&mut self, keyword: Keyword) -> Result<bool> {
        Ok(self.peek()?.kind.is_keyword(keyword))
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.check(kind)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind)? {
            self.advance()
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<Token> {
        if self.check_keyword(keyword)? {
            self.advance()
        } else {
            Err(self.unexpected(&format!("`{}`", keyword)))
        }
    }

    /// An identifier, or a keyword that is not reserved.
    fn expect_ident(&mut self, what: &str) -> Result<Ident> {
        let name = match self.peek_kind()? {
            TokenKind::Ident(name) => name,
            TokenKind::Keyword(keyword) if !keyword.is_reserved() => keyword.as_str().to_string(),
            _ => return Err(self.unexpected(what)),
        };
        let token = self.advance()?;
        Ok(Spanned::new(name, token.span))
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end.max(start.end))
    }

    /// Runs `f` one nesting level deeper, failing past the configured limit.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            let span = self.peek()?.span;
            return Err(self.error(ParseErrorKind::NestingTooDeep(self.max_depth), span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn error(&self, kind: ParseErrorKind, span: Span) -> Error {
        ParseError {
            kind,
            span,
            location: self.lexer.location(span.start),
        }
        .into()
    }

    /// Builds an "expected X, found Y" error against the next token.
    fn unexpected(&mut self, expected: &str) -> Error {
        let token = match self.peek() {
            Ok(token) => token.clone(),
            Err(e) => return e,
        };
        self.error(
            ParseErrorKind::Expected {
                expected: expected.to_string(),
                found: token.kind.to_string(),
            },
            token.span,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        BinaryOp, ExprKind, MatchItem, Operation, PathSegment, ServiceItem, SourceFile,
    };
    use crate::{parse, Location};
    use assert_matches::assert_matches;
    use proptest::prelude::*;

    const FIRESTORE: &str = r#"
rules_version = '2';
service cloud.firestore {
  match /databases/{db}/documents {
    match /users/{userId} {
      allow read, write: if request.auth.uid == userId;
    }
  }
}
"#;

    fn ident(expr: &ExprKind) -> &str {
        match expr {
            ExprKind::Identifier(name) => name,
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn end_to_end_firestore_rules() {
        let file = parse(FIRESTORE).unwrap();
        assert_eq!(file.rules_version(), Some("2"));
        assert_eq!(file.services.len(), 1);

        let service = &file.services[0];
        assert_eq!(service.name.node, "cloud.firestore");
        assert_eq!(service.body.len(), 1);

        let databases = match &service.body[0] {
            ServiceItem::Match(m) => m,
            other => panic!("expected match, got {:?}", other),
        };
        let path: Vec<_> = databases.path.iter().map(|s| s.node.clone()).collect();
        assert_eq!(
            path,
            vec![
                PathSegment::Literal("databases".into()),
                PathSegment::Capture("db".into()),
                PathSegment::Literal("documents".into()),
            ]
        );

        let users = match &databases.body[0] {
            MatchItem::Match(m) => m,
            other => panic!("expected match, got {:?}", other),
        };
        assert_eq!(users.path.len(), 2);
        assert_eq!(users.path[1].node, PathSegment::Capture("userId".into()));

        let allow = match &users.body[0] {
            MatchItem::Allow(a) => a,
            other => panic!("expected allow, got {:?}", other),
        };
        let ops: Vec<_> = allow.operations.iter().map(|o| o.node).collect();
        assert_eq!(ops, vec![Operation::Read, Operation::Write]);

        // request.auth.uid == userId
        match &allow.condition.node {
            ExprKind::Binary { op, left, right } => {
                assert_eq!(*op, BinaryOp::Eq);
                assert_eq!(ident(right), "userId");
                match &left.node {
                    ExprKind::Member { object, member } => {
                        assert_eq!(ident(member), "uid");
                        assert_matches!(&object.node, ExprKind::Member { .. });
                    }
                    other => panic!("expected member, got {:?}", other),
                }
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn spans_point_into_source() {
        let file = parse(FIRESTORE).unwrap();
        let service = &file.services[0];
        assert_eq!(service.name.span.slice(FIRESTORE), Some("cloud.firestore"));

        let version = file.version.as_ref().unwrap();
        assert_eq!(version.span.slice(FIRESTORE), Some("rules_version = '2';"));
    }

    #[test]
    fn parsing_is_deterministic() {
        let first = parse(FIRESTORE).unwrap();
        let second = parse(FIRESTORE).unwrap();
        assert_eq!(first, second);
        // spans are not part of equality; compare them through serialization.
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    fn condition() -> impl Strategy<Value = String> {
        let atom = prop::sample::select(vec![
            "true",
            "request.auth != null",
            "request.auth.uid == userId",
            "'admin' in request.auth.token.roles",
            "resource.data.size is int",
            "get(/databases/$(database)/documents/users/$(request.auth.uid)).data.admin",
            "[1,,2][0] < 3.5",
        ]);
        prop::collection::vec(atom, 1..4).prop_map(|atoms| atoms.join(" && "))
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::sample::select(vec!["users", "posts", "a.b:c", "%2F"])
                .prop_map(|s| format!("/{}", s)),
            prop::sample::select(vec!["userId", "database", "list"])
                .prop_map(|s| format!("/{{{}}}", s)),
            Just("/{rest=**}".to_string()),
        ]
    }

    fn rules_source() -> impl Strategy<Value = String> {
        let operations = vec![
            "read", "write", "get", "list", "create", "update", "delete",
        ];
        let allow = (
            prop::sample::subsequence(operations, 1..3),
            condition(),
        )
            .prop_map(|(ops, cond)| format!("allow {}: if {};", ops.join(", "), cond));
        let block = (
            prop::collection::vec(segment(), 1..4),
            prop::collection::vec(allow, 1..3),
        )
            .prop_map(|(path, allows)| {
                format!("match {} {{ {} }}", path.concat(), allows.join(" "))
            });
        (
            any::<bool>(),
            prop::sample::select(vec!["cloud.firestore", "firebase.storage"]),
            prop::collection::vec(block, 0..3),
        )
            .prop_map(|(versioned, name, blocks)| {
                let version = if versioned { "rules_version = '2';\n" } else { "" };
                format!("{}service {} {{\n{}\n}}", version, name, blocks.join("\n"))
            })
    }

    fn outcome(source: &str) -> std::result::Result<serde_json::Value, String> {
        parse(source)
            .map(|file| serde_json::to_value(&file).unwrap())
            .map_err(|e| e.to_string())
    }

    proptest! {
        #[test]
        fn generated_rules_parse_identically_twice(source in rules_source()) {
            let first = outcome(&source);
            prop_assert!(first.is_ok(), "{:?} failed: {:?}", source, first);
            prop_assert_eq!(first, outcome(&source));
        }

        #[test]
        fn arbitrary_input_gives_the_same_outcome_twice(source in "[ -~\n]{0,64}") {
            prop_assert_eq!(outcome(&source), outcome(&source));
        }
    }

    #[test]
    fn empty_source_is_an_empty_file() {
        let file = parse("  // nothing here\n").unwrap();
        assert_eq!(
            file,
            SourceFile {
                version: None,
                services: vec![]
            }
        );
    }

    #[test]
    fn error_reports_location() {
        let err = parse("service a {\n  allow read: if true;\n}").unwrap_err();
        assert_eq!(err.location(), Some(Location { line: 2, column: 3 }));
        assert_matches!(
            err,
            Error::Parse(ParseError {
                kind: ParseErrorKind::Expected { .. },
                ..
            })
        );
        assert_eq!(
            err.to_string(),
            "expected `function`, `match` or `}`, found keyword `allow` at 2:3"
        );
    }

    #[test]
    fn lex_errors_surface_through_parse() {
        let err = parse("service a { match /x { allow read: if 'open } }").unwrap_err();
        assert_matches!(err, Error::Lex(_));
    }

    #[test]
    fn parses_concurrently() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| parse(FIRESTORE).map(|f| f.services.len())))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 1);
        }
    }
}
