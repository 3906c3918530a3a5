//! Splitting directive arguments
//!
//!     A DirectiveArgs token is split into pieces without looking at any declaration:
//!         - whitespace runs become Trivia
//!         - `"..."` is a Quoted value (backslash escapes a quote)
//!         - text starting with `{` or `[` is a Json value running to the matching bracket
//!         - `{{type:arguments}}` is an expression
//!         - anything else is a Word running to the next whitespace
//!
//!     After a quoted value, `//` starts a trailing comment that runs to the end of the line and
//!     is kept as Trivia. This lets `#r "x.dll" // why` reference a file without the comment
//!     turning into an unexpected argument.

use crate::polyglot::token::{Token, TokenKind};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentPiece {
    Trivia(Token),
    /// A Word, Quoted or Json token
    Value(Token),
    /// The tokens of one `{{...}}`: punctuation, trivia, a Word for the type and optionally
    /// ExpressionText for the arguments
    Expression(Vec<Token>),
}

struct Splitter<'a> {
    text: &'a str,
    base: usize,
}

impl<'a> Splitter<'a> {
    fn token(&self, kind: TokenKind, range: Range<usize>) -> Token {
        Token::new(
            kind,
            self.base + range.start..self.base + range.end,
            &self.text[range],
        )
    }

    /// Emit `range` as leading trivia, `kind`, trailing trivia, skipping empty parts.
    fn push_padded(&self, tokens: &mut Vec<Token>, range: Range<usize>, kind: TokenKind) {
        let slice = &self.text[range.clone()];
        let content = slice.trim();
        if content.is_empty() {
            if !slice.is_empty() {
                tokens.push(self.token(TokenKind::Trivia, range));
            }
            return;
        }
        let start = range.start + (slice.len() - slice.trim_start().len());
        let end = start + content.len();
        if start > range.start {
            tokens.push(self.token(TokenKind::Trivia, range.start..start));
        }
        tokens.push(self.token(kind, start..end));
        if end < range.end {
            tokens.push(self.token(TokenKind::Trivia, end..range.end));
        }
    }

    fn expression(&self, range: Range<usize>) -> Vec<Token> {
        let mut tokens = vec![self.token(TokenKind::Punctuation, range.start..range.start + 2)];
        let inner = range.start + 2..range.end - 2;
        match self.text[inner.clone()].find(':') {
            Some(colon) => {
                let colon = inner.start + colon;
                self.push_padded(&mut tokens, inner.start..colon, TokenKind::Word);
                tokens.push(self.token(TokenKind::Punctuation, colon..colon + 1));
                self.push_padded(&mut tokens, colon + 1..inner.end, TokenKind::ExpressionText);
            }
            None => self.push_padded(&mut tokens, inner, TokenKind::Word),
        }
        tokens.push(self.token(TokenKind::Punctuation, range.end - 2..range.end));
        tokens
    }
}

fn whitespace_len(text: &str) -> usize {
    text.find(|c: char| !c.is_whitespace())
        .unwrap_or(text.len())
}

/// Length of a quoted string starting at the opening quote. Unterminated strings run to the end.
fn quoted_len(text: &str) -> usize {
    let mut escaped = false;
    for (index, ch) in text.char_indices().skip(1) {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return index + 1,
            _ => {}
        }
    }
    text.len()
}

/// Length of a JSON literal up to its matching close bracket. Unbalanced literals run to the end.
fn json_len(text: &str) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return index + ch.len_utf8();
                }
            }
            _ => {}
        }
    }
    text.len()
}

pub fn split_arguments(arguments: &Token) -> Vec<ArgumentPiece> {
    let splitter = Splitter {
        text: &arguments.text,
        base: arguments.span.start,
    };
    let text = splitter.text;
    let mut pieces = Vec::new();
    let mut cursor = 0;
    let mut after_quoted = false;

    while let Some(ch) = text[cursor..].chars().next() {
        let rest = &text[cursor..];

        if ch.is_whitespace() {
            let end = cursor + whitespace_len(rest);
            pieces.push(ArgumentPiece::Trivia(
                splitter.token(TokenKind::Trivia, cursor..end),
            ));
            cursor = end;
            continue;
        }

        if after_quoted && rest.starts_with("//") {
            pieces.push(ArgumentPiece::Trivia(
                splitter.token(TokenKind::Trivia, cursor..text.len()),
            ));
            break;
        }
        after_quoted = false;

        if rest.starts_with("{{") {
            if let Some(close) = rest.find("}}") {
                let end = cursor + close + 2;
                pieces.push(ArgumentPiece::Expression(splitter.expression(cursor..end)));
                cursor = end;
                continue;
            }
        }

        let (kind, end) = match ch {
            '"' => {
                after_quoted = true;
                (TokenKind::Quoted, cursor + quoted_len(rest))
            }
            '{' | '[' => (TokenKind::Json, cursor + json_len(rest)),
            _ => (
                TokenKind::Word,
                cursor + rest.find(char::is_whitespace).unwrap_or(rest.len()),
            ),
        };
        pieces.push(ArgumentPiece::Value(splitter.token(kind, cursor..end)));
        cursor = end;
    }

    pieces
}
