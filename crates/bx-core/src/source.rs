use std::path::Path;

use crate::span::{FileId, LineCol, Span};

/// Display name used when a caller parses text that did not come from a file.
pub const ANONYMOUS_SOURCE: &str = "<input>";

/// Source text plus the name diagnostics should point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(id: FileId, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn anonymous(text: impl Into<String>) -> Self {
        Self::new(0, ANONYMOUS_SOURCE, text)
    }

    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS_SOURCE
    }

    /// File name without directories or extension, e.g. `User` for `model/User.cfc`.
    pub fn stem(&self) -> Option<&str> {
        if self.is_anonymous() {
            return None;
        }
        Path::new(&self.name).file_stem().and_then(|s| s.to_str())
    }

    /// Lower-cased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
    }

    /// Text of the 1-based line `line`, without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.text
            .split('\n')
            .nth(line.checked_sub(1)? as usize)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
    }
}

/// Byte offsets of every line start, for turning offsets into [`LineCol`].
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| idx as u32 + 1),
        );
        Self { line_starts }
    }

    pub fn line_col(&self, text: &str, offset: usize) -> LineCol {
        let offset = offset.min(text.len());
        let line = match self.line_starts.binary_search(&(offset as u32)) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line] as usize;
        let column = text
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        LineCol::new(line as u32 + 1, column as u32 + 1)
    }

    pub fn span(&self, file: FileId, text: &str, lo: usize, hi: usize) -> Span {
        Span::new(
            file,
            lo as u32,
            hi as u32,
            self.line_col(text, lo),
            self.line_col(text, hi),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_to_one_based_positions() {
        let text = "ab\ncdé\nf";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 0), LineCol::new(1, 1));
        assert_eq!(index.line_col(text, 2), LineCol::new(1, 3));
        assert_eq!(index.line_col(text, 3), LineCol::new(2, 1));
        // `é` is two bytes but one column
        assert_eq!(index.line_col(text, 7), LineCol::new(2, 4));
        assert_eq!(index.line_col(text, 8), LineCol::new(3, 1));
    }

    #[test]
    fn stem_ignores_directories() {
        let file = SourceFile::new(1, "models/User.cfc", "component {}");
        assert_eq!(file.stem(), Some("User"));
        assert_eq!(file.extension().as_deref(), Some("cfc"));
        assert_eq!(SourceFile::anonymous("x").stem(), None);
    }
}
