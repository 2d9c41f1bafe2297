//! Source positions and line lookup utilities

use serde::Serialize;
use std::path::PathBuf;

/// A position in tokenized source: 0-based line and token index within it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A start/end position pair carried by every AST node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Merge two spans into one that covers both
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A source file with its content and line information
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file
    pub fn new(path: PathBuf, content: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            path,
            content,
            line_starts,
        }
    }

    /// Get the file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Get the file content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Byte offset at which a 0-indexed line starts
    pub fn line_offset(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Get a line by number (0-indexed), without its line break
    pub fn get_line(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(self.content.len());

        Some(self.content[start..end].trim_end_matches('\r'))
    }

    /// Absolute byte range for a character range within a line
    pub fn absolute_range(&self, line: usize, range: std::ops::Range<usize>) -> (usize, usize) {
        let Some(start) = self.line_offset(line) else {
            return (self.content.len(), 0);
        };
        let line_len = self.get_line(line).map(str::len).unwrap_or(0);
        let offset = start + range.start.min(line_len);
        let len = range.end.min(line_len).saturating_sub(range.start.min(line_len));
        (offset, len)
    }
}

#[cfg(test)]
#[path = "span_tests.rs"]
mod tests;
