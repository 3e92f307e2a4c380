//! Error types for markup parsing

use std::fmt;
use thiserror::Error;

/// Byte offset plus 1-based line and column in the source markup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Why markup could not be parsed
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("document has no root element")]
    EmptyDocument,
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("invalid name")]
    InvalidName,
    #[error("mismatched closing tag: expected </{expected}>, found </{found}>")]
    MismatchedTag { expected: String, found: String },
    #[error("duplicate attribute: {name}")]
    DuplicateAttribute { name: String },
    #[error("unterminated markup")]
    UnterminatedMarkup,
    /// Unknown named entity; doctype-defined entities are never expanded
    #[error("invalid entity: &{entity};")]
    InvalidEntity { entity: String },
    #[error("invalid utf-8")]
    InvalidUtf8,
    #[error("content after root element")]
    TrailingContent,
    #[error("max depth exceeded: {max}")]
    MaxDepthExceeded { max: u16 },
    #[error("max size exceeded: {max}")]
    MaxSizeExceeded { max: usize },
}

/// Error raised when markup cannot be turned into a document tree
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("error at {pos}: {kind}")]
pub struct Error {
    kind: ErrorKind,
    pos: Pos,
}

impl Error {
    pub const fn at(kind: ErrorKind, pos: Pos) -> Self {
        Self { kind, pos }
    }

    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Where parsing stopped
    pub const fn pos(&self) -> Pos {
        self.pos
    }
}

/// Result type alias for markup parsing
pub type Result<T> = std::result::Result<T, Error>;
