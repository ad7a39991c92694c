use serde::Serialize;
use tracing::debug;

use crate::ast::{Expr, SourceFile};
use crate::lexer::Comment;
use crate::span::{Location, Span};
use crate::{Error, Result};

use super::Parser;

/// Nesting limit used unless [`ParserBuilder::with_max_depth`] says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 128;

pub struct ParserBuilder<'a> {
    source: &'a str,
    max_depth: usize,
    comments: bool,
}

impl<'a> ParserBuilder<'a> {
    pub fn from_source(source: &'a str) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
            comments: false,
        }
    }

    /// Caps how deeply match blocks and expressions may nest before parsing
    /// fails with [`crate::ParseErrorKind::NestingTooDeep`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Keeps the comments skipped while scanning.
    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn build(self) -> Result<Rules> {
        debug!(
            len = self.source.len(),
            max_depth = self.max_depth,
            "parsing rules"
        );

        let mut parser = Parser::new(self.source, self.max_depth);
        let file = match parser.source_file().and_then(|file| {
            parser.expect_end()?;
            Ok(file)
        }) {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "rules rejected");
                return Err(e);
            }
        };

        let comments = if self.comments {
            parser.into_comments()
        } else {
            Vec::new()
        };

        debug!(
            services = file.services.len(),
            comments = comments.len(),
            "parsed rules"
        );
        Ok(Rules {
            source: self.source.into(),
            file,
            comments,
        })
    }

    /// Parses the whole source as a single expression.
    pub fn build_expression(self) -> Result<Expr> {
        let mut parser = Parser::new(self.source, self.max_depth);
        let expr = parser.expression()?;
        parser.expect_end()?;
        Ok(expr)
    }
}

/// A parsed rules file together with the text it was parsed from.
#[derive(Debug, Clone, Serialize)]
pub struct Rules {
    #[serde(skip)]
    source: String,
    file: SourceFile,
    comments: Vec<Comment>,
}

impl Rules {
    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn into_file(self) -> SourceFile {
        self.file
    }

    /// Empty unless the builder was asked to keep comments.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn location(&self, span: Span) -> Location {
        Location::from_offset(&self.source, span.start)
    }

    pub fn text(&self, span: Span) -> Option<&str> {
        span.slice(&self.source)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::Serializing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ServiceItem;
    use crate::lexer::CommentKind;
    use crate::ParseErrorKind;
    use assert_matches::assert_matches;

    const RULES: &str = "// storage rules
rules_version = '2';
service firebase.storage {
  /* everything under b */
  match /b/{bucket}/o {
    allow read: if request.auth != null;
  }
}
";

    #[test]
    fn default_build_drops_comments() {
        let rules = ParserBuilder::from_source(RULES).build().unwrap();
        assert!(rules.comments().is_empty());
        assert_eq!(rules.file().rules_version(), Some("2"));
    }

    #[test]
    fn keeps_comments_when_asked() {
        let rules = ParserBuilder::from_source(RULES)
            .with_comments(true)
            .build()
            .unwrap();
        let kinds: Vec<_> = rules.comments().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![CommentKind::Line, CommentKind::Block]);
        assert_eq!(rules.text(rules.comments()[0].span), Some("// storage rules"));
    }

    #[test]
    fn maps_spans_to_locations() {
        let rules = ParserBuilder::from_source(RULES).build().unwrap();
        let service = &rules.file().services[0];
        assert_eq!(rules.location(service.span), Location { line: 3, column: 1 });
        match &service.body[0] {
            ServiceItem::Match(m) => {
                assert_eq!(rules.location(m.span), Location { line: 5, column: 3 });
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn depth_limit_is_configurable() {
        let source = format!("{}x{}", "[".repeat(20), "]".repeat(20));
        assert!(ParserBuilder::from_source(&source).build_expression().is_ok());
        assert_matches!(
            ParserBuilder::from_source(&source)
                .with_max_depth(10)
                .build_expression(),
            Err(Error::Parse(e)) if e.kind == ParseErrorKind::NestingTooDeep(10)
        );
    }

    #[test]
    fn expression_must_consume_all_input() {
        assert_matches!(
            ParserBuilder::from_source("a b").build_expression(),
            Err(Error::Parse(_))
        );
    }

    #[test]
    fn serializes_to_json() {
        let rules = ParserBuilder::from_source(RULES).build().unwrap();
        let json: serde_json::Value = serde_json::from_str(&rules.to_json().unwrap()).unwrap();
        assert_eq!(json["file"]["version"]["node"]["version"], "2");
        assert_eq!(
            json["file"]["services"][0]["node"]["name"]["node"],
            "firebase.storage"
        );
        assert!(json.get("source").is_none());
    }
}
