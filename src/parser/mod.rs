//! Front end for M
//!
//! This module provides:
//! - Tokenizer (one token sequence per source line)
//! - Parser (AST construction)
//! - AST definitions
//! - Span tracking

pub mod ast;
pub mod lexer;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod span;

pub use ast::*;
pub use lexer::{tokenize, Token, TokenKind, TokenizedLine};
pub use parser::Parser;
pub use span::SourceFile;

use crate::diagnostics::DiagnosticBag;

/// Parse tokenized lines into a program
pub fn parse(lines: &[TokenizedLine]) -> Result<Program, DiagnosticBag> {
    Parser::new(lines).parse_program()
}

/// Tokenize and parse source code.
///
/// Lexical errors stop the pipeline before parsing starts.
pub fn parse_source(source: &str) -> Result<Program, DiagnosticBag> {
    let (lines, errors) = tokenize(source);
    if !errors.is_empty() {
        return Err(errors.into());
    }
    parse(&lines)
}

/// Tokenize and parse one line of direct-mode input
pub fn parse_direct_line(source: &str) -> Result<Vec<Command>, DiagnosticBag> {
    let (lines, errors) = tokenize(source);
    if !errors.is_empty() {
        return Err(errors.into());
    }
    Parser::new(&lines).parse_direct_line()
}

#[cfg(test)]
mod tests;
