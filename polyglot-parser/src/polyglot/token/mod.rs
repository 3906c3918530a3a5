//! Core token types and helpers shared across the lexer, parser, and tooling.

pub mod core;
pub mod formatting;

pub use core::{Token, TokenKind};
pub use formatting::detokenize;
