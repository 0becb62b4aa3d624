//! Source position and span tracking for the ISL front end.
//!
//! Arithmetic on spans (containment, overlap, union, slicing source text) is
//! done on byte offsets, the way a hand-written lexer wants it; 1-based
//! line/column positions are derived once through a [`LineIndex`] rather than
//! recomputed on every comparison.

mod line_index;

pub use line_index::LineIndex;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A source span: a half-open byte range `[start_byte, end_byte)` plus the
/// derived 1-based line/column positions of its endpoints.
///
/// `Span` is informational only. Structural equality on AST nodes ignores
/// spans entirely; `Span`'s own `PartialEq` is provided for tests and for
/// diagnostics deduplication, not for AST comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: Option<Arc<str>>,
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    /// Builds a span directly from already-known line/column positions.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file: Option<Arc<str>>,
        start_byte: usize,
        end_byte: usize,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        debug_assert!(start_byte <= end_byte, "Span: start_byte ({start_byte}) > end_byte ({end_byte})");
        Self { file, start_byte, end_byte, start_line, start_column, end_line, end_column }
    }

    /// Builds a span from a byte range, deriving line/column positions from
    /// `index` (built once per source text by the lexer).
    pub fn from_byte_range(
        file: Option<Arc<str>>,
        text: &str,
        index: &LineIndex,
        start_byte: usize,
        end_byte: usize,
    ) -> Self {
        let (start_line, start_column) = index.offset_to_position(text, start_byte);
        let (end_line, end_column) = index.offset_to_position(text, end_byte);
        Self::new(file, start_byte, end_byte, start_line, start_column, end_line, end_column)
    }

    /// An empty span at byte offset 0, line 1 column 1 — used where a span is
    /// structurally required but no real source location applies (e.g. a
    /// synthesised node in fuzzy-parser normalisation).
    pub fn synthetic() -> Self {
        Self::new(None, 0, 0, 1, 1, 1, 1)
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start_byte == self.end_byte
    }

    #[inline]
    pub const fn contains(&self, byte_offset: usize) -> bool {
        byte_offset >= self.start_byte && byte_offset < self.end_byte
    }

    #[inline]
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start_byte <= other.start_byte && other.end_byte <= self.end_byte
    }

    #[inline]
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }

    /// Extracts the slice of source text covered by this span's byte range.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start_byte..self.end_byte]
    }

    /// Returns a span covering both this span and `other`. The file of `self`
    /// wins; callers should only union spans from the same source.
    pub fn union(&self, other: &Span) -> Span {
        let (start, start_line, start_column) = if self.start_byte <= other.start_byte {
            (self.start_byte, self.start_line, self.start_column)
        } else {
            (other.start_byte, other.start_line, other.start_column)
        };
        let (end, end_line, end_column) = if self.end_byte >= other.end_byte {
            (self.end_byte, self.end_line, self.end_column)
        } else {
            (other.end_byte, other.end_line, other.end_column)
        };
        Span::new(self.file.clone(), start, end, start_line, start_column, end_line, end_column)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("<unknown>");
        write!(f, "{file}:{}:{}", self.start_line, self.start_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        Span::new(None, start, end, 1, start as u32 + 1, 1, end as u32 + 1)
    }

    #[test]
    fn contains() {
        let s = span(5, 10);
        assert!(!s.contains(4));
        assert!(s.contains(5));
        assert!(s.contains(9));
        assert!(!s.contains(10));
    }

    #[test]
    fn contains_span() {
        let outer = span(0, 20);
        let inner = span(5, 15);
        let partial = span(15, 25);
        assert!(outer.contains_span(&inner));
        assert!(!inner.contains_span(&outer));
        assert!(!outer.contains_span(&partial));
    }

    #[test]
    fn overlaps() {
        let a = span(0, 10);
        let b = span(5, 15);
        let c = span(10, 20);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn union() {
        let a = span(0, 10);
        let b = span(5, 15);
        let u = a.union(&b);
        assert_eq!((u.start_byte, u.end_byte), (0, 15));
    }

    #[test]
    fn from_byte_range_derives_line_column() {
        let text = "domain Foo {\n  version: \"1\"\n}";
        let index = LineIndex::new(text);
        let span = Span::from_byte_range(None, text, &index, 14, 21);
        assert_eq!(span.start_line, 2);
        assert_eq!(span.start_column, 3);
        assert_eq!(span.slice(text), "version");
    }

    #[test]
    fn display_format() {
        let s = Span::new(Some(Arc::from("foo.isl")), 0, 3, 1, 1, 1, 4);
        assert_eq!(format!("{s}"), "foo.isl:1:1");
    }
}
