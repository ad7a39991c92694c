use thiserror::Error;

use crate::span::{Location, Span};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("An error occurred serializing syntax tree {0}.")]
    Serializing(#[from] serde_json::Error),
}

impl Error {
    /// Source location of a lex or parse error.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Lex(e) => Some(e.location),
            Error::Parse(e) => Some(e.location),
            Error::Serializing(_) => None,
        }
    }
}

/// The scanner could not produce a token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {location}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated block comment")]
    UnterminatedComment,

    #[error("integer literal {0} is out of range")]
    IntegerOverflow(String),

    #[error("float literal {0} is out of range")]
    FloatOutOfRange(String),
}

/// The token stream does not match the grammar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {location}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("function body must end with a return statement")]
    MissingReturn,

    #[error("match block must contain at least one declaration")]
    EmptyMatchBody,

    #[error("malformed path segment: {0}")]
    MalformedPathSegment(String),

    #[error("duplicate function parameter `{0}`")]
    DuplicateParameter(String),

    #[error("nesting exceeds the limit of {0} levels")]
    NestingTooDeep(usize),

    #[error("integer literal {0} is out of range")]
    IntegerOutOfRange(u64),
}
