//! Core token definitions
//!
//!     Every token owns a byte span into the submission and a copy of the text it covers.
//!     Token spans of a lexed submission are contiguous and non-overlapping, which is what makes
//!     the syntax tree lossless.
//!
//!     There are two families of kinds. The submission level kinds are produced by the lexer:
//!     Trivia, Language, Directive and DirectiveArgs. The argument level kinds are produced when
//!     a DirectiveArgs token is split by the directive argument parser: Word, Quoted, Json,
//!     Punctuation and ExpressionText. Argument tokens keep spans relative to the whole
//!     submission, not to the argument text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Whitespace and line breaks
    Trivia,
    /// Source code for a kernel
    Language,
    /// A directive name such as `#!csharp`, `#r` or `#i`
    Directive,
    /// Everything after a directive name up to the end of its line
    DirectiveArgs,
    Word,
    Quoted,
    Json,
    /// `{{`, `}}` and the `:` separating an expression type from its arguments
    Punctuation,
    ExpressionText,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Trivia)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Trivia => "trivia",
            TokenKind::Language => "language",
            TokenKind::Directive => "directive",
            TokenKind::DirectiveArgs => "directive-args",
            TokenKind::Word => "word",
            TokenKind::Quoted => "quoted",
            TokenKind::Json => "json",
            TokenKind::Punctuation => "punctuation",
            TokenKind::ExpressionText => "expression-text",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }

    /// Build a token from a span of `source`.
    pub fn from_source(kind: TokenKind, source: &str, span: Range<usize>) -> Self {
        let text = source[span.clone()].to_string();
        Self { kind, span, text }
    }

    pub fn is_significant(&self) -> bool {
        !self.kind.is_trivia()
    }

    /// The same token reclassified as `kind`.
    pub fn with_kind(mut self, kind: TokenKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
