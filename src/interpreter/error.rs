//! Runtime error types for the M interpreter.

use crate::diagnostics::{error_codes::runtime, Diagnostic};
use crate::parser::span::Span;

/// Runtime error with error code and message.
///
/// Any runtime error halts the whole program. Once the interpreter has
/// recorded one as a diagnostic it keeps unwinding with a [`halted`] marker
/// so enclosing expressions do not record it again.
///
/// [`halted`]: RuntimeError::halted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RuntimeError {
    /// Error code (E4xxx series for runtime errors)
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
    /// Command or expression that failed
    pub span: Option<Span>,
    halted: bool,
}

impl RuntimeError {
    /// Create a new runtime error
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            halted: false,
        }
    }

    /// Attach a source location unless one is already known
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Signal for a halt whose cause has already been recorded (or was an
    /// explicit `halt` command)
    pub fn halted() -> Self {
        Self {
            code: "HALT",
            message: String::new(),
            span: None,
            halted: true,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Neither a tag nor an extern has this name
    pub fn tag_not_found(name: &str) -> Self {
        Self::new(runtime::TAG_NOT_FOUND, format!("Tag not found: {}", name))
    }

    /// Merge source and destination overlap
    pub fn merge_overlap(name: &str) -> Self {
        Self::new(
            runtime::MERGE_OVERLAP,
            format!("Cannot merge overlapping variables: {}", name),
        )
    }

    /// `$select` found no true condition
    pub fn select_exhausted() -> Self {
        Self::new(runtime::SELECT_EXHAUSTED, "No $select condition was true")
    }

    pub fn division_by_zero() -> Self {
        Self::new(runtime::DIVISION_BY_ZERO, "Division by zero")
    }

    /// Malformed builtin usage
    pub fn invalid_argument(builtin: &str, detail: &str) -> Self {
        Self::new(
            runtime::INVALID_ARGUMENT,
            format!("Invalid argument to ${}: {}", builtin, detail),
        )
    }

    pub fn no_entry_point(name: &str) -> Self {
        Self::new(
            runtime::NO_ENTRY_POINT,
            format!("No tag named '{}' to start from", name),
        )
    }

    /// Nested `do`/`$$` calls went deeper than `limit`
    pub fn call_depth_exceeded(limit: usize) -> Self {
        Self::new(
            runtime::CALL_DEPTH_EXCEEDED,
            format!("Call depth exceeded ({} nested calls)", limit),
        )
    }

    /// Convert to a diagnostic positioned at the start of the failing node
    pub fn to_diagnostic(&self) -> Diagnostic {
        let start = self.span.map(|span| span.start).unwrap_or_default();
        Diagnostic::error(self.code)
            .message(self.message.clone())
            .at(start.line, start.column)
            .build()
    }
}
