//! Diagnostic reporting for the M interpreter
//!
//! Every phase (tokenizer, parser, interpreter) reports problems as
//! [`Diagnostic`] records with a stable error code, a 0-based line and a
//! column expressed as a token index within that line.

use serde::{Deserialize, Serialize};
use std::ops::Range;

pub mod error_codes;
pub use error_codes::*;

/// A single error record produced by any phase of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable error code (e.g., "E1001")
    pub code: String,

    /// Primary message
    pub message: String,

    /// Source line (0-indexed)
    pub line: usize,

    /// Token index within the line (not a character column)
    pub column: usize,

    /// Character range within the line, used only for rendering
    #[serde(skip)]
    pub range: Option<Range<usize>>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder {
            code: code.into(),
            message: String::new(),
            line: 0,
            column: 0,
            range: None,
        }
    }

    /// Format as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format as `line:column: message`
    pub fn to_line(&self) -> String {
        format!("{}:{}: {}", self.line, self.column, self.message)
    }

    /// Format as a human-readable block with the offending source line
    pub fn to_human_readable(&self, source: &str) -> String {
        let mut output = format!(
            "error[{}]: {}\n  --> {}:{}\n",
            self.code, self.message, self.line, self.column
        );

        if let Some(line) = source.lines().nth(self.line) {
            output.push_str(&format!("   |\n{:>3} | {}\n   |", self.line, line));

            if let Some(range) = &self.range {
                let underline_len = range.end.saturating_sub(range.start).max(1);
                output.push_str(&format!(
                    " {}{}\n",
                    " ".repeat(range.start),
                    "^".repeat(underline_len)
                ));
            } else {
                output.push('\n');
            }
        }

        output
    }
}

/// Builder for constructing diagnostics
pub struct DiagnosticBuilder {
    code: String,
    message: String,
    line: usize,
    column: usize,
    range: Option<Range<usize>>,
}

impl DiagnosticBuilder {
    /// Set the message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the line and token column
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Set the character range within the line
    pub fn range(mut self, range: Range<usize>) -> Self {
        self.range = Some(range);
        self
    }

    /// Build the diagnostic
    pub fn build(self) -> Diagnostic {
        Diagnostic {
            code: self.code,
            message: self.message,
            line: self.line,
            column: self.column,
            range: self.range,
        }
    }
}

/// A collection of diagnostics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Create a new empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics
    pub fn take(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Merge another bag into this one
    pub fn merge(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Get the number of diagnostics
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Format all diagnostics as JSON
    pub fn to_json(&self) -> String {
        let json_array: Vec<String> = self.diagnostics.iter().map(|d| d.to_json()).collect();
        format!("[{}]", json_array.join(","))
    }

    /// Format all diagnostics as a `line:column: message` list
    pub fn format_text(&self) -> String {
        self.diagnostics
            .iter()
            .map(Diagnostic::to_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Diagnostic> for DiagnosticBag {
    fn from(diagnostic: Diagnostic) -> Self {
        let mut bag = DiagnosticBag::new();
        bag.push(diagnostic);
        bag
    }
}

impl From<Vec<Diagnostic>> for DiagnosticBag {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}
