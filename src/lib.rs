#![deny(rust_2018_idioms)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::cognitive_complexity,
    clippy::large_enum_variant,
    clippy::similar_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::match_same_arms,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args
)]
pub mod ast;
mod errors;
mod lexer;
mod parser;
mod printer;
mod span;
mod token;
mod visit;

pub use errors::{Error, LexError, LexErrorKind, ParseError, ParseErrorKind, Result};
pub use lexer::{tokenize, Comment, CommentKind, Lexer};
pub use parser::{ParserBuilder, Rules, DEFAULT_MAX_DEPTH};
pub use span::{Location, Span, Spanned};
pub use token::{Keyword, Token, TokenKind};
pub use visit::{
    walk_expr, walk_function, walk_match, walk_path_literal, walk_service, walk_source_file,
    Visitor,
};

use ast::{Expr, SourceFile};

/// Parses a complete rules file with the default settings.
pub fn parse(source: &str) -> Result<SourceFile> {
    ParserBuilder::from_source(source)
        .build()
        .map(Rules::into_file)
}

/// Parses a single expression, such as the condition of an `allow`.
pub fn parse_expression(source: &str) -> Result<Expr> {
    ParserBuilder::from_source(source).build_expression()
}

/// Serializes a syntax tree, spans included, as pretty-printed JSON.
pub fn to_json(file: &SourceFile) -> Result<String> {
    serde_json::to_string_pretty(file).map_err(Error::Serializing)
}
