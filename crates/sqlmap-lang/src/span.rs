//! Byte ranges into template text.

use std::fmt;
use std::ops::Range;

/// Half-open byte range `start..end` of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty span at `offset`, used for errors at end of input.
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Smallest span containing both.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text covered by the span.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }

    /// Line and column where the span starts.
    pub fn location(&self, source: &str) -> Location {
        Location::of(source, self.start)
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// 1-based line and character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Locate byte `offset` in `source`.
    pub fn of(source: &str, offset: usize) -> Self {
        let before = source.get(..offset).unwrap_or(source);
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Self {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_slice() {
        let source = "WHERE id = #id#";
        let merged = Span::new(0, 5).merge(Span::new(6, 8));
        assert_eq!(merged, Span::new(0, 8));
        assert_eq!(merged.slice(source), "WHERE id");
        assert_eq!(Span::at(99).slice(source), "");
        assert!(Span::at(3).is_empty());
    }

    #[test]
    fn test_location() {
        let source = "SELECT *\nFROM t\nWHERE x";
        assert_eq!(Location::of(source, 0), Location { line: 1, column: 1 });
        assert_eq!(Location::of(source, 9), Location { line: 2, column: 1 });
        assert_eq!(Span::new(18, 19).location(source).to_string(), "3:3");
    }
}
