use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{LexError, LexErrorKind};
use crate::span::{Location, Span};
use crate::token::{Keyword, Token, TokenKind};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z_0-9]*").unwrap();
    static ref NUMBER: Regex = Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)").unwrap();
    static ref PATH_TEXT: Regex = Regex::new(r"^[a-zA-Z0-9_%\-~&'.:]+").unwrap();
    static ref SERVICE_NAME: Regex = Regex::new(r"^[^\s{]+").unwrap();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment skipped by the lexer. Kept so formatters can re-attach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
    pub span: Span,
}

/// Pull-based scanner over one rules source.
///
/// Tokens are produced one at a time by `next_token`; the lexer never looks
/// further ahead than the token it is scanning. Path segment text and
/// service names are only recognized when the parser asks for them, since
/// their character sets overlap with ordinary tokens.
#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    comments: Vec<Comment>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            comments: Vec::new(),
            done: false,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Byte offset of the next unscanned character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia()?;

        let start = self.offset;
        let rest = self.rest();
        let ch = match rest.chars().next() {
            Some(ch) => ch,
            None => return Ok(Token::new(TokenKind::Eof, Span::point(start))),
        };
        let after = &rest[ch.len_utf8()..];

        match ch {
            'a'..='z' | 'A'..='Z' | '_' => Ok(self.word()),
            '0'..='9' => self.number(),
            '.' if after.starts_with(|c: char| c.is_ascii_digit()) => self.number(),
            '"' | '\'' => self.string(ch),
            _ => {
                let (kind, len) = self.operator(ch, after)?;
                self.offset += len;
                Ok(Token::new(kind, Span::new(start, self.offset)))
            }
        }
    }

    /// Scans the literal text of a path segment directly at the cursor,
    /// without skipping whitespace.
    pub(crate) fn scan_path_text(&mut self) -> Option<Token> {
        let len = PATH_TEXT.find(self.rest())?.end();
        Some(self.take(len, |text| TokenKind::PathText(text.to_string())))
    }

    /// Scans an unstructured service name such as `cloud.firestore`.
    pub(crate) fn scan_service_name(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia()?;
        let len = match SERVICE_NAME.find(self.rest()) {
            Some(m) => m.end(),
            None => return Ok(None),
        };
        Ok(Some(
            self.take(len, |text| TokenKind::ServiceName(text.to_string())),
        ))
    }

    /// The character at the cursor, trivia included.
    pub(crate) fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// True when the cursor sits on a `/` that directly opens another path
    /// segment: `/text`, `/{` or `/$`.
    pub(crate) fn at_path_segment(&self) -> bool {
        self.rest().strip_prefix('/').is_some_and(|after| {
            after.starts_with(|c: char| c == '{' || c == '$') || PATH_TEXT.is_match(after)
        })
    }

    pub(crate) fn location(&self, offset: usize) -> Location {
        Location::from_offset(self.source, offset)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn error(&self, kind: LexErrorKind, offset: usize) -> LexError {
        LexError {
            kind,
            offset,
            location: self.location(offset),
        }
    }

    fn take(&mut self, len: usize, kind: impl FnOnce(&'a str) -> TokenKind) -> Token {
        let start = self.offset;
        self.offset += len;
        let text = &self.source[start..self.offset];
        Token::new(kind(text), Span::new(start, self.offset))
    }

    /// Skips whitespace and comments, recording the comments.
    pub(crate) fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.offset += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                let len = trimmed.find('\n').unwrap_or(trimmed.len());
                self.push_comment(CommentKind::Line, len);
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                match body.find("*/") {
                    Some(end) => self.push_comment(CommentKind::Block, end + 4),
                    None => return Err(self.error(LexErrorKind::UnterminatedComment, self.offset)),
                }
            } else {
                return Ok(());
            }
        }
    }

    fn push_comment(&mut self, kind: CommentKind, len: usize) {
        let start = self.offset;
        self.offset += len;
        self.comments.push(Comment {
            kind,
            text: self.source[start..self.offset].to_string(),
            span: Span::new(start, self.offset),
        });
    }

    fn word(&mut self) -> Token {
        let len = IDENTIFIER.find(self.rest()).map_or(0, |m| m.end());
        self.take(len, |text| match Keyword::lookup(text) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(text.to_string()),
        })
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let start = self.offset;
        let len = NUMBER.find(self.rest()).map_or(0, |m| m.end());
        let text = &self.source[start..start + len];

        let kind = if text.contains('.') {
            let value = text
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| {
                    self.error(LexErrorKind::FloatOutOfRange(text.to_string()), start)
                })?;
            TokenKind::Float(value)
        } else {
            let value = text.parse::<u64>().map_err(|_| {
                self.error(LexErrorKind::IntegerOverflow(text.to_string()), start)
            })?;
            TokenKind::Int(value)
        };

        self.offset += len;
        Ok(Token::new(kind, Span::new(start, self.offset)))
    }

    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.offset;
        let mut value = String::new();
        let mut chars = self.rest().char_indices().skip(1);

        while let Some((index, ch)) = chars.next() {
            match ch {
                c if c == quote => {
                    self.offset = start + index + c.len_utf8();
                    return Ok(Token::new(
                        TokenKind::Str(value),
                        Span::new(start, self.offset),
                    ));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, c @ '\\')) | Some((_, c @ '\'')) | Some((_, c @ '"')) => value.push(c),
                    // unknown escapes (regex classes like `\d`) are kept as written
                    Some((_, c)) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                '\n' => break,
                c => value.push(c),
            }
        }

        Err(self.error(LexErrorKind::UnterminatedString, start))
    }

    fn operator(&self, ch: char, after: &str) -> Result<(TokenKind, usize), LexError> {
        let next = after.chars().next();
        let token = match (ch, next) {
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('=', Some('*')) if after.starts_with("**") => (TokenKind::GlobAssign, 3),
            ('!', Some('=')) => (TokenKind::BangEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('&', _) => (TokenKind::Amp, 1),
            ('|', _) => (TokenKind::Pipe, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (':', _) => (TokenKind::Colon, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('?', _) => (TokenKind::Question, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('$', _) => (TokenKind::Dollar, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('~', _) => (TokenKind::Tilde, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('%', _) => (TokenKind::Percent, 1),
            _ => return Err(self.error(LexErrorKind::UnexpectedChar(ch), self.offset)),
        };
        Ok(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => {
                self.done = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Scans a whole source into tokens, excluding the end-of-input marker.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use test_case::test_case;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("source should lex")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test_case("&&", TokenKind::AndAnd; "and")]
    #[test_case("||", TokenKind::OrOr; "or")]
    #[test_case("&", TokenKind::Amp; "amp")]
    #[test_case("|", TokenKind::Pipe; "pipe")]
    #[test_case("^", TokenKind::Caret; "caret")]
    #[test_case("==", TokenKind::EqEq; "eq")]
    #[test_case("!=", TokenKind::BangEq; "not eq")]
    #[test_case("<=", TokenKind::LtEq; "lt eq")]
    #[test_case(">=", TokenKind::GtEq; "gt eq")]
    #[test_case("=**", TokenKind::GlobAssign; "glob assign")]
    #[test_case("=", TokenKind::Assign; "assign")]
    #[test_case("$", TokenKind::Dollar; "dollar")]
    #[test_case("~", TokenKind::Tilde; "tilde")]
    fn scans_operator(source: &str, expected: TokenKind) {
        assert_eq!(kinds(source), vec![expected]);
    }

    #[test_case("42", TokenKind::Int(42); "integer")]
    #[test_case("4.25", TokenKind::Float(4.25); "float")]
    #[test_case("3.", TokenKind::Float(3.0); "float without fraction")]
    #[test_case(".5", TokenKind::Float(0.5); "float without whole part")]
    fn scans_number(source: &str, expected: TokenKind) {
        assert_eq!(kinds(source), vec![expected]);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("allow read if request_1"),
            vec![
                TokenKind::Keyword(Keyword::Allow),
                TokenKind::Keyword(Keyword::Read),
                TokenKind::Keyword(Keyword::If),
                TokenKind::Ident("request_1".into()),
            ]
        );
    }

    #[test]
    fn member_dot_is_not_a_float() {
        assert_eq!(
            kinds("a.b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Dot,
                TokenKind::Ident("b".into())
            ]
        );
    }

    #[test]
    fn strings_decode_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b\n" '\d+'"#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\"b\n".into()),
                TokenKind::Str("\\d+".into()),
            ]
        );
    }

    #[test]
    fn comments_are_trivia_but_recorded() {
        let mut lexer = Lexer::new("a // line\n/* block\n */ b");
        let tokens: Vec<_> = lexer.by_ref().collect::<Result<_, _>>().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].span, Span::new(23, 24));

        let comments = lexer.comments();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].kind, CommentKind::Line);
        assert_eq!(comments[0].text, "// line");
        assert_eq!(comments[1].kind, CommentKind::Block);
        assert_eq!(comments[1].text, "/* block\n */");
    }

    #[test]
    fn spans_track_byte_offsets() {
        let tokens = tokenize("  foo <= 'x'").unwrap();
        assert_eq!(tokens[0].span, Span::new(2, 5));
        assert_eq!(tokens[1].span, Span::new(6, 8));
        assert_eq!(tokens[2].span, Span::new(9, 12));
    }

    #[test]
    fn unexpected_character() {
        let err = tokenize("a\n  # b").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnexpectedChar('#'));
        assert_eq!(err.offset, 4);
        assert_eq!(err.location, Location { line: 2, column: 3 });
    }

    #[test_case("'abc"; "missing quote")]
    #[test_case("\"ab\ncd\""; "raw newline")]
    #[test_case("'ab\\"; "dangling escape")]
    fn unterminated_string(source: &str) {
        let err = tokenize(source).unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn unterminated_comment() {
        let err = tokenize("a /* b").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::UnterminatedComment);
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn integer_overflow() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert_matches!(err.kind, LexErrorKind::IntegerOverflow(_));
    }

    #[test]
    fn integer_magnitude_of_min_lexes() {
        assert_eq!(
            kinds("-9223372036854775808"),
            vec![TokenKind::Minus, TokenKind::Int(9_223_372_036_854_775_808)]
        );
    }

    #[test]
    fn infinite_float_is_rejected() {
        let source = format!("{}.0", "9".repeat(400));
        let err = tokenize(&source).unwrap_err();
        assert_matches!(err.kind, LexErrorKind::FloatOutOfRange(ref text) if *text == source);
        assert_eq!(err.offset, 0);
    }

    #[test]
    fn offset_advances_over_trivia_and_tokens() {
        let mut lexer = Lexer::new("  ab /* c */");
        assert_eq!(lexer.source(), "  ab /* c */");
        assert_eq!(lexer.offset(), 0);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Ident("ab".into()));
        assert_eq!(lexer.offset(), 4);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.offset(), lexer.source().len());
    }

    #[test_case("/a", true; "text")]
    #[test_case("/{a}", true; "capture")]
    #[test_case("/$(a)", true; "reference")]
    #[test_case("/.:~", true; "punctuation text")]
    #[test_case("/ a", false; "space")]
    #[test_case("/2", true; "digit")]
    #[test_case("/(", false; "paren")]
    #[test_case("a/b", false; "no slash")]
    fn detects_path_segment_start(source: &str, expected: bool) {
        assert_eq!(Lexer::new(source).at_path_segment(), expected);
    }

    #[test]
    fn path_text_is_scanned_on_demand() {
        let mut lexer = Lexer::new("/users.v1:x/{id}");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Slash);
        let text = lexer.scan_path_text().unwrap();
        assert_eq!(text.kind, TokenKind::PathText("users.v1:x".into()));
        assert!(lexer.at_path_segment());
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Slash);
        assert_eq!(lexer.scan_path_text(), None);
        assert_eq!(lexer.peek_char(), Some('{'));
    }

    #[test]
    fn slash_followed_by_space_does_not_open_segment() {
        let lexer = Lexer::new("/ 2");
        assert!(!lexer.at_path_segment());
    }

    #[test]
    fn service_name_stops_at_whitespace_or_brace() {
        let mut lexer = Lexer::new("  cloud.firestore{");
        let name = lexer.scan_service_name().unwrap().unwrap();
        assert_eq!(name.kind, TokenKind::ServiceName("cloud.firestore".into()));
        assert_eq!(name.span, Span::new(2, 17));
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::LBrace);
    }

    proptest! {
        #[test]
        fn lexing_never_panics(source in "\\PC{0,64}") {
            let _ = tokenize(&source);
        }

        #[test]
        fn token_spans_are_ordered(source in "[a-z0-9 +*/(){}.,'<=!&|-]{0,48}") {
            if let Ok(tokens) = tokenize(&source) {
                for pair in tokens.windows(2) {
                    prop_assert!(pair[0].span.end <= pair[1].span.start);
                }
            }
        }
    }
}
