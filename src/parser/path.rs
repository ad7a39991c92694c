use crate::ast::{Expr, Literal, PathLiteral, PathLiteralSegment, PathSegment};
use crate::errors::{ParseErrorKind, Result};
use crate::span::{Span, Spanned};
use crate::token::{Token, TokenKind};

use super::Parser;

/// What follows the `/` of a segment.
enum SegmentHead {
    Text(String),
    /// `{`, already consumed.
    Brace,
    /// `$(`, already consumed.
    Reference,
}

impl Parser<'_> {
    /// Consumes a `/` and classifies the segment behind it. With `adjacent`
    /// the segment must touch the slash, so `/ users` is malformed; otherwise
    /// whitespace and comments may separate them.
    fn segment_head(&mut self, adjacent: bool) -> Result<(Span, SegmentHead)> {
        let slash = self.expect(&TokenKind::Slash)?;
        if !adjacent {
            self.lexer.skip_trivia()?;
        }

        let head = match self.lexer.peek_char() {
            Some('{') => {
                self.advance()?;
                SegmentHead::Brace
            }
            Some('$') => {
                self.advance()?;
                self.expect(&TokenKind::LParen)?;
                SegmentHead::Reference
            }
            next => {
                if let Some(Token {
                    kind: TokenKind::PathText(text),
                    span,
                }) = self.lexer.scan_path_text()
                {
                    self.prev_end = span.end;
                    SegmentHead::Text(text)
                } else {
                    let found = next.map_or_else(
                        || "end of input".to_string(),
                        |c| format!("`{}`", c.escape_debug()),
                    );
                    return Err(self.error(
                        ParseErrorKind::MalformedPathSegment(format!(
                            "unexpected {} after `/`",
                            found
                        )),
                        Span::point(self.lexer.offset()),
                    ));
                }
            }
        };
        Ok((slash.span, head))
    }

    /// The path of a `match` block: `/users/{userId}/{rest=**}`.
    pub(crate) fn match_path(&mut self) -> Result<Vec<Spanned<PathSegment>>> {
        let mut segments = Vec::new();
        loop {
            let (start, head) = self.segment_head(false)?;
            let segment = match head {
                SegmentHead::Text(text) => PathSegment::Literal(text),
                SegmentHead::Brace => {
                    let name = self.expect_ident("capture name")?;
                    let glob = self.eat(&TokenKind::GlobAssign)?;
                    self.expect(&TokenKind::RBrace)?;
                    if glob {
                        PathSegment::CaptureGroup(name.node)
                    } else {
                        PathSegment::Capture(name.node)
                    }
                }
                SegmentHead::Reference => {
                    return Err(self.error(
                        ParseErrorKind::MalformedPathSegment(
                            "`$(...)` is only allowed in path expressions".to_string(),
                        ),
                        self.span_from(start),
                    ));
                }
            };
            segments.push(Spanned::new(segment, self.span_from(start)));

            if !self.check(&TokenKind::Slash)? {
                return Ok(segments);
            }
        }
    }

    /// A path value inside an expression: `/databases/$(db)/documents/{id}`.
    ///
    /// A further segment starts only at a `/` that directly touches the next
    /// segment, so `/a/b / 2` is a path divided by two.
    pub(crate) fn path_literal(&mut self) -> Result<Expr> {
        let mut segments = Vec::new();
        let mut span: Option<Span> = None;

        loop {
            let (start, head) = self.segment_head(true)?;
            let segment = match head {
                SegmentHead::Text(text) => PathLiteralSegment::Literal(text),
                SegmentHead::Brace => {
                    let name = self.expect_ident("binding name")?;
                    if self.check(&TokenKind::GlobAssign)? {
                        let glob = self.peek()?.span;
                        return Err(self.error(
                            ParseErrorKind::MalformedPathSegment(
                                "`=**` is only allowed in match paths".to_string(),
                            ),
                            glob,
                        ));
                    }
                    self.expect(&TokenKind::RBrace)?;
                    PathLiteralSegment::Bind(name.node)
                }
                SegmentHead::Reference => {
                    let expr = self.expression()?;
                    self.expect(&TokenKind::RParen)?;
                    PathLiteralSegment::Reference(Box::new(expr))
                }
            };
            let segment_span = self.span_from(start);
            span = Some(span.map_or(segment_span, |s| s.merge(segment_span)));
            segments.push(Spanned::new(segment, segment_span));

            if self.peeked.is_some() || !self.lexer.at_path_segment() {
                break;
            }
        }

        let span = span.unwrap_or_default();
        Ok(Expr::literal(Literal::Path(PathLiteral { segments }), span))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{
        ExprKind, Literal, MatchItem, PathLiteralSegment, PathSegment, ServiceItem,
    };
    use crate::errors::{Error, ParseError, ParseErrorKind};
    use crate::span::Span;
    use crate::{parse, parse_expression};
    use assert_matches::assert_matches;
    use test_case::test_case;

    fn match_path(path: &str) -> Vec<PathSegment> {
        let source = format!("service s {{ match {} {{ allow read: if true; }} }}", path);
        let file = parse(&source).expect("rules should parse");
        match &file.services[0].body[0] {
            ServiceItem::Match(m) => m.path.iter().map(|s| s.node.clone()).collect(),
            other => panic!("expected match, got {:?}", other),
        }
    }

    fn path_literal(source: &str) -> Vec<PathLiteralSegment> {
        let expr = parse_expression(source).expect("path should parse");
        match expr.node {
            ExprKind::Literal(Literal::Path(path)) => {
                path.segments.into_iter().map(|s| s.node).collect()
            }
            other => panic!("expected path literal, got {:?}", other),
        }
    }

    fn error_kind(result: crate::Result<impl std::fmt::Debug>) -> ParseErrorKind {
        match result {
            Err(Error::Parse(ParseError { kind, .. })) => kind,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn match_path_segments() {
        assert_eq!(
            match_path("/databases/{database}/documents/{document=**}"),
            vec![
                PathSegment::Literal("databases".into()),
                PathSegment::Capture("database".into()),
                PathSegment::Literal("documents".into()),
                PathSegment::CaptureGroup("document".into()),
            ]
        );
    }

    #[test_case("/b.c:d", "b.c:d"; "dots and colons")]
    #[test_case("/a-b_c~d", "a-b_c~d"; "dashes underscores tildes")]
    #[test_case("/%2Fx", "%2Fx"; "percent escapes")]
    #[test_case("/123", "123"; "digits")]
    fn match_path_text(path: &str, expected: &str) {
        assert_eq!(match_path(path), vec![PathSegment::Literal(expected.into())]);
    }

    #[test]
    fn capture_names_allow_inner_whitespace_and_keywords() {
        assert_eq!(
            match_path("/{ list }/{ rest =** }"),
            vec![
                PathSegment::Capture("list".into()),
                PathSegment::CaptureGroup("rest".into()),
            ]
        );
    }

    #[test]
    fn match_path_rejects_references() {
        let source = "service s { match /a/$(x) { allow read: if true; } }";
        assert_matches!(
            error_kind(parse(source)),
            ParseErrorKind::MalformedPathSegment(_)
        );
    }

    #[test_case("service s { match /a/ ; }"; "trailing slash")]
    #[test_case("service s { match /a/ ( { allow read: if true; } }"; "paren after slash")]
    #[test_case("service s { match /"; "end of input")]
    fn malformed_match_paths(source: &str) {
        assert_matches!(
            error_kind(parse(source)),
            ParseErrorKind::MalformedPathSegment(_)
        );
    }

    #[test]
    fn match_path_allows_trivia_after_slash() {
        assert_eq!(match_path("/ a"), vec![PathSegment::Literal("a".into())]);
        assert_eq!(
            match_path("/ users /* id */ / {id}"),
            vec![
                PathSegment::Literal("users".into()),
                PathSegment::Capture("id".into()),
            ]
        );
    }

    #[test]
    fn malformed_segment_points_past_trivia() {
        let source = "service s { match /a/  ; }";
        match parse(source) {
            Err(Error::Parse(ParseError { kind, span, .. })) => {
                assert_matches!(kind, ParseErrorKind::MalformedPathSegment(_));
                assert_eq!(span, Span::point(23));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn match_segment_spans_include_the_slash() {
        let source = "service s { match /users/{id} { allow read: if true; } }";
        let file = parse(source).unwrap();
        let m = match &file.services[0].body[0] {
            ServiceItem::Match(m) => m,
            other => panic!("expected match, got {:?}", other),
        };
        let texts: Vec<_> = m.path.iter().map(|s| s.span.slice(source).unwrap()).collect();
        assert_eq!(texts, vec!["/users", "/{id}"]);
        assert_matches!(&m.body[0], MatchItem::Allow(_));
    }

    #[test]
    fn path_literal_segments() {
        let segments = path_literal("/databases/$(database)/documents/users/{uid}");
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0], PathLiteralSegment::Literal("databases".into()));
        assert_matches!(
            &segments[1],
            PathLiteralSegment::Reference(expr) if expr.node == ExprKind::Identifier("database".into())
        );
        assert_eq!(segments[4], PathLiteralSegment::Bind("uid".into()));
    }

    #[test]
    fn path_reference_holds_a_full_expression() {
        let segments = path_literal("/users/$(request.auth.uid + '-' + suffix)");
        assert_matches!(
            &segments[1],
            PathLiteralSegment::Reference(expr) if matches!(expr.node, ExprKind::Binary { .. })
        );
    }

    #[test]
    fn path_literal_span() {
        let expr = parse_expression("/a/$(b)/c == x").unwrap();
        match &expr.node {
            ExprKind::Binary { left, .. } => assert_eq!(left.span, Span::new(0, 9)),
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn path_ends_at_whitespace() {
        let expr = parse_expression("exists(/a/b) && /c / d").unwrap();
        match &expr.node {
            ExprKind::Binary { right, .. } => {
                assert_matches!(&right.node, ExprKind::Binary { left, .. }
                    if matches!(&left.node, ExprKind::Literal(Literal::Path(p)) if p.segments.len() == 1));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn path_literal_rejects_capture_groups() {
        assert_matches!(
            error_kind(parse_expression("/a/{rest=**}")),
            ParseErrorKind::MalformedPathSegment(_)
        );
    }

    #[test]
    fn lone_slash_is_malformed() {
        assert_matches!(
            error_kind(parse_expression("/ a")),
            ParseErrorKind::MalformedPathSegment(_)
        );
    }
}
