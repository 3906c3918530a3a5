//! Position and location tracking for submission text
//!
//! ## Types
//!
//! - [`Position`] - A line:column position in the submission
//! - [`Range`] - A range with start/end positions and the byte span it covers
//! - [`SourceLocation`] - Utility for converting byte offsets to positions
//!
//! Lines are split on `\n` only; a `\r\n` pair counts the `\r` as the last column of its line.
//! Columns are byte offsets from the start of the line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range as ByteRange;

/// Represents a position in source code (line and column)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Represents a location in source code (start and end positions)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::new(0..0, Position::default(), Position::default())
    }
}

/// Provides fast conversion from byte offsets to line/column positions
#[derive(Debug, Clone)]
pub struct SourceLocation {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceLocation {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];

        for (byte_pos, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }

        Self { line_starts }
    }

    /// Convert a byte offset to a line/column position
    pub fn byte_to_position(&self, byte_offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i - 1);

        let column = byte_offset - self.line_starts[line];

        Position::new(line, column)
    }

    /// Convert a byte range to a [`Range`]
    pub fn byte_range_to_range(&self, range: &ByteRange<usize>) -> Range {
        Range::new(
            range.clone(),
            self.byte_to_position(range.start),
            self.byte_to_position(range.end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        assert!(Position::new(1, 5) < Position::new(2, 0));
        assert!(Position::new(1, 5) < Position::new(1, 6));
    }

    #[test]
    fn test_range_display() {
        let range = Range::new(0..0, Position::new(1, 0), Position::new(2, 5));
        assert_eq!(format!("{}", range), "1:0..2:5");
    }

    #[test]
    fn test_byte_to_position_multiline() {
        let loc = SourceLocation::new("#!csharp\nvar x\n#!fsharp");

        assert_eq!(loc.byte_to_position(0), Position::new(0, 0));
        assert_eq!(loc.byte_to_position(8), Position::new(0, 8));
        assert_eq!(loc.byte_to_position(9), Position::new(1, 0));
        assert_eq!(loc.byte_to_position(15), Position::new(2, 0));
    }

    #[test]
    fn test_crlf_keeps_carriage_return_on_line() {
        let loc = SourceLocation::new("a\r\nb");
        assert_eq!(loc.byte_to_position(1), Position::new(0, 1));
        assert_eq!(loc.byte_to_position(3), Position::new(1, 0));
    }

    #[test]
    fn test_byte_range_to_range() {
        let loc = SourceLocation::new("ab\ncd");
        let range = loc.byte_range_to_range(&(1..4));
        assert_eq!(range.start, Position::new(0, 1));
        assert_eq!(range.end, Position::new(1, 1));
        assert_eq!(range.span, 1..4);
    }
}
