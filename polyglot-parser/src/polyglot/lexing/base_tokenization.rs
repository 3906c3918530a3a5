//! Core tokenization using logos
//!
//!     The logos lexer only knows about characters, not about line positions, so it cannot
//!     decide on its own whether `#!csharp` is a directive. It produces raw tokens that the
//!     directive detection pass interprets.
//!
//!     Bytes no pattern recognises (exotic Unicode whitespace, mostly) come back from logos as
//!     errors. They are kept as [RawToken::Text] so the output always covers the whole input.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawToken {
    #[regex(r"\r\n|\n|\r")]
    Newline,

    #[regex(r"[ \t\x0B\x0C]+")]
    Whitespace,

    /// `#!` followed by any run of non-whitespace
    #[regex(r"#![^\s]*")]
    Bang,

    #[token("#r")]
    Reference,

    #[token("#i")]
    Include,

    #[token("#")]
    Hash,

    #[regex(r"[^\s#]+")]
    Text,
}

impl RawToken {
    pub fn is_line_break(self) -> bool {
        matches!(self, RawToken::Newline)
    }

    pub fn is_whitespace(self) -> bool {
        matches!(self, RawToken::Newline | RawToken::Whitespace)
    }
}

/// Tokenize source into raw tokens paired with their byte spans.
pub fn tokenize(source: &str) -> Vec<(RawToken, Range<usize>)> {
    let mut lexer = RawToken::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let token = result.unwrap_or(RawToken::Text);
        tokens.push((token, lexer.span()));
    }

    tokens
}
