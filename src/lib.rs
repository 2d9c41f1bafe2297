//! mlang: an interpreter for a line-oriented, tag-addressable M dialect
//!
//! Source text goes through three stages: [`parser::tokenize`] splits it into
//! per-line token sequences, [`parser::parse`] builds a [`parser::Program`],
//! and the [`interpreter`] walks that tree. [`evaluate`] runs the whole
//! pipeline once; [`interpreter::Session`] keeps a loaded program around for
//! repeated tag invocations.

pub mod array;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod interpreter;
pub mod parser;

use crate::interpreter::{Evaluation, Externs, Session};

/// Tokenize, parse and run `source`.
///
/// Execution starts at the `main` tag, or at the first command when there is
/// no such tag. The first stage that reports errors ends the pipeline, and
/// any error leaves `output` empty.
pub fn evaluate(source: &str, externs: Externs) -> Evaluation {
    let mut session = match Session::load(source, externs) {
        Ok(session) => session,
        Err(bag) => return Evaluation::failed(bag.take()),
    };

    let mut evaluation = session.run_main();
    if !evaluation.errors.is_empty() {
        evaluation.output.clear();
    }
    evaluation
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::array::MArray;
    pub use crate::diagnostics::{Diagnostic, DiagnosticBag};
    pub use crate::evaluate;
    pub use crate::interpreter::{Evaluation, ExternFunction, Externs, MValue, Session};
    pub use crate::parser::ast::*;
}
