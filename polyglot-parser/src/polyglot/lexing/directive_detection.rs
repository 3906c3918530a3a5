//! Directive detection
//!
//!     Walks the raw logos tokens and produces submission level tokens. Text between directives
//!     is buffered as a region and flushed as Trivia / Language / Trivia when the next directive
//!     (or the end of input) is reached.

use super::base_tokenization::RawToken;
use crate::polyglot::token::{Token, TokenKind};
use std::ops::Range;

type RawStream<'a> = &'a [(RawToken, Range<usize>)];

struct TokenEmitter<'s> {
    source: &'s str,
    tokens: Vec<Token>,
}

impl<'s> TokenEmitter<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
        }
    }

    fn emit(&mut self, kind: TokenKind, span: Range<usize>) {
        if !span.is_empty() {
            self.tokens
                .push(Token::from_source(kind, self.source, span));
        }
    }

    /// Emit a run of non-directive text as leading trivia, language, trailing trivia.
    fn flush_text_region(&mut self, region: Range<usize>) {
        if region.is_empty() {
            return;
        }
        let text = &self.source[region.clone()];
        let Some(first) = text.find(|c: char| !c.is_whitespace()) else {
            self.emit(TokenKind::Trivia, region);
            return;
        };
        let last = text
            .char_indices()
            .rev()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(text.len());

        let language_start = region.start + first;
        let language_end = region.start + last;
        self.emit(TokenKind::Trivia, region.start..language_start);
        self.emit(TokenKind::Language, language_start..language_end);
        self.emit(TokenKind::Trivia, language_end..region.end);
    }
}

fn is_at_line_start(raw: RawStream<'_>, index: usize) -> bool {
    index == 0 || raw[index - 1].0.is_line_break()
}

fn is_directive_start(raw: RawStream<'_>, index: usize) -> bool {
    let (kind, span) = &raw[index];
    match kind {
        // A bare `#!` is only a directive when nothing follows it
        RawToken::Bang => span.len() > 2 || index + 1 == raw.len(),
        RawToken::Reference | RawToken::Include => match raw.get(index + 1) {
            None => true,
            Some((next, _)) => next.is_whitespace(),
        },
        _ => false,
    }
}

/// Emit the directive starting at `index` and its arguments. Returns the index of the first raw
/// token after the directive's trailing trivia.
fn lex_directive(emitter: &mut TokenEmitter<'_>, raw: RawStream<'_>, index: usize) -> usize {
    let (_, name_span) = &raw[index];
    emitter.emit(TokenKind::Directive, name_span.clone());

    let mut cursor = index + 1;
    let mut trivia_start = None;

    if let Some((RawToken::Whitespace, whitespace)) = raw.get(cursor) {
        let args_begin = cursor + 1;
        let mut args_end = args_begin;
        while args_end < raw.len() && !raw[args_end].0.is_line_break() {
            args_end += 1;
        }

        if args_end > args_begin {
            emitter.emit(TokenKind::Trivia, whitespace.clone());
            emitter.emit(
                TokenKind::DirectiveArgs,
                raw[args_begin].1.start..raw[args_end - 1].1.end,
            );
        } else {
            trivia_start = Some(whitespace.start);
        }
        cursor = args_end;
    }

    // Up to and including the line break. The next line's indentation belongs to its code.
    let mut trivia_end = None;
    while let Some((kind, span)) = raw.get(cursor) {
        if !kind.is_whitespace() {
            break;
        }
        trivia_start.get_or_insert(span.start);
        trivia_end = Some(span.end);
        cursor += 1;
        if kind.is_line_break() {
            break;
        }
    }

    match (trivia_start, trivia_end) {
        (Some(start), Some(end)) => emitter.emit(TokenKind::Trivia, start..end),
        (Some(start), None) => emitter.emit(TokenKind::Trivia, start..raw[cursor - 1].1.end),
        _ => {}
    }

    cursor
}

/// Turn raw tokens into Trivia, Language, Directive and DirectiveArgs tokens.
pub fn detect_directives(source: &str, raw: &[(RawToken, Range<usize>)]) -> Vec<Token> {
    let mut emitter = TokenEmitter::new(source);
    let mut region_start = 0;
    let mut index = 0;

    while index < raw.len() {
        if is_at_line_start(raw, index) && is_directive_start(raw, index) {
            emitter.flush_text_region(region_start..raw[index].1.start);
            index = lex_directive(&mut emitter, raw, index);
            region_start = raw
                .get(index)
                .map(|(_, span)| span.start)
                .unwrap_or(source.len());
            continue;
        }
        index += 1;
    }

    emitter.flush_text_region(region_start..source.len());
    emitter.tokens
}
