use serde::{Deserialize, Serialize};

/// Caller-chosen identifier of a source file. Nothing interns these globally;
/// the caller that owns the [`crate::source::SourceFile`] picks the number.
pub type FileId = u32;

/// 1-based line and column. Columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    pub const START: LineCol = LineCol { line: 1, column: 1 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file: FileId,
    pub lo: u32,
    pub hi: u32,
    pub start: LineCol,
    pub end: LineCol,
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Span({}:{}-{})", self.file, self.start, self.end)
    }
}

impl Span {
    pub fn new(file: FileId, lo: u32, hi: u32, start: LineCol, end: LineCol) -> Span {
        Span {
            file,
            lo,
            hi,
            start,
            end,
        }
    }

    /// Zero-width span used by synthesized nodes that have no source text.
    pub fn null() -> Span {
        Span::new(0, 0, 0, LineCol::START, LineCol::START)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let (lo, start) = if other.lo < self.lo {
            (other.lo, other.start)
        } else {
            (self.lo, self.start)
        };
        let (hi, end) = if other.hi > self.hi {
            (other.hi, other.end)
        } else {
            (self.hi, self.end)
        };
        Span::new(self.file, lo, hi, start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    pub fn len(&self) -> usize {
        (self.hi - self.lo) as usize
    }
}
