use std::fmt;

use crate::span::Span;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    RulesVersion,
    Service,
    Function,
    Match,
    Return,
    Let,
    Allow,
    If,
    Read,
    Get,
    List,
    Write,
    Update,
    Delete,
    Create,
    True,
    False,
    Null,
    Is,
    In,
}

impl Keyword {
    pub fn lookup(text: &str) -> Option<Keyword> {
        let keyword = match text {
            "rules_version" => Keyword::RulesVersion,
            "service" => Keyword::Service,
            "function" => Keyword::Function,
            "match" => Keyword::Match,
            "return" => Keyword::Return,
            "let" => Keyword::Let,
            "allow" => Keyword::Allow,
            "if" => Keyword::If,
            "read" => Keyword::Read,
            "get" => Keyword::Get,
            "list" => Keyword::List,
            "write" => Keyword::Write,
            "update" => Keyword::Update,
            "delete" => Keyword::Delete,
            "create" => Keyword::Create,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            "is" => Keyword::Is,
            "in" => Keyword::In,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::RulesVersion => "rules_version",
            Keyword::Service => "service",
            Keyword::Function => "function",
            Keyword::Match => "match",
            Keyword::Return => "return",
            Keyword::Let => "let",
            Keyword::Allow => "allow",
            Keyword::If => "if",
            Keyword::Read => "read",
            Keyword::Get => "get",
            Keyword::List => "list",
            Keyword::Write => "write",
            Keyword::Update => "update",
            Keyword::Delete => "delete",
            Keyword::Create => "create",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
            Keyword::Is => "is",
            Keyword::In => "in",
        }
    }

    /// Keywords that can never name a variable, function or member.
    ///
    /// Every other keyword is only special at the start of a declaration,
    /// so `get(...)`, `resource.data.list` and `let match = 1` stay valid.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Keyword::True | Keyword::False | Keyword::Null | Keyword::Is | Keyword::In
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Assign,
    Question,
    Slash,
    Dollar,
    /// `=**` inside a capture group segment.
    GlobAssign,

    // operators
    Bang,
    Minus,
    Plus,
    Tilde,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Caret,
    Star,
    Percent,
    Lt,
    LtEq,
    EqEq,
    BangEq,
    GtEq,
    Gt,

    Keyword(Keyword),
    Ident(String),
    /// Magnitude only; a leading `-` is its own token.
    Int(u64),
    Float(f64),
    Str(String),
    /// Literal text of a path segment, scanned right after `/`.
    PathText(String),
    /// Unstructured service name such as `cloud.firestore`.
    ServiceName(String),

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, TokenKind::Keyword(k) if *k == keyword)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Assign => "=",
            TokenKind::Question => "?",
            TokenKind::Slash => "/",
            TokenKind::Dollar => "$",
            TokenKind::GlobAssign => "=**",
            TokenKind::Bang => "!",
            TokenKind::Minus => "-",
            TokenKind::Plus => "+",
            TokenKind::Tilde => "~",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Star => "*",
            TokenKind::Percent => "%",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::GtEq => ">=",
            TokenKind::Gt => ">",
            TokenKind::Keyword(k) => return write!(f, "keyword `{}`", k),
            TokenKind::Ident(name) => return write!(f, "identifier `{}`", name),
            TokenKind::Int(value) => return write!(f, "integer `{}`", value),
            TokenKind::Float(value) => return write!(f, "float `{}`", value),
            TokenKind::Str(value) => return write!(f, "string {:?}", value),
            TokenKind::PathText(text) => return write!(f, "path segment `{}`", text),
            TokenKind::ServiceName(name) => return write!(f, "service name `{}`", name),
            TokenKind::Eof => return f.write_str("end of input"),
        };
        write!(f, "`{}`", symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_round_trips() {
        for text in &["rules_version", "service", "allow", "create", "is", "in", "null"] {
            let keyword = Keyword::lookup(text).unwrap();
            assert_eq!(keyword.as_str(), *text);
        }
        assert_eq!(Keyword::lookup("request"), None);
    }

    #[test]
    fn only_literal_and_operator_keywords_are_reserved() {
        assert!(Keyword::In.is_reserved());
        assert!(Keyword::True.is_reserved());
        assert!(!Keyword::Get.is_reserved());
        assert!(!Keyword::Match.is_reserved());
    }
}
