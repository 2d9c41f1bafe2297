//! Terminal rendering of diagnostics through miette.

use std::fmt;
use std::path::Path;

use miette::{GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, SourceSpan};

use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::parser::SourceFile;

/// One diagnostic bound to the file it was reported against
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct SourceReport {
    code: String,
    message: String,
    location: String,
    src: NamedSource<String>,
    span: Option<SourceSpan>,
}

impl SourceReport {
    pub(crate) fn new(file: &SourceFile, diagnostic: &Diagnostic) -> Self {
        let span = diagnostic.range.clone().map(|range| {
            let (offset, len) = file.absolute_range(diagnostic.line, range);
            SourceSpan::from((offset, len))
        });

        Self {
            code: diagnostic.code.clone(),
            message: diagnostic.message.clone(),
            location: format!("line {}, token {}", diagnostic.line, diagnostic.column),
            src: NamedSource::new(file.path().display().to_string(), file.content().to_string()),
            span,
        }
    }
}

impl miette::Diagnostic for SourceReport {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!(
            "at {}; run `mlang explain {}` for details",
            self.location, self.code
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some("here".to_string()),
            span,
        ))))
    }
}

/// Render diagnostics as miette reports using `theme`
pub(crate) fn render(
    file: &SourceFile,
    diagnostics: &[Diagnostic],
    theme: GraphicalTheme,
) -> String {
    let handler = GraphicalReportHandler::new_themed(theme);
    let mut out = String::new();
    for diagnostic in diagnostics {
        let report = SourceReport::new(file, diagnostic);
        if handler.render_report(&mut out, &report).is_err() {
            out.push_str(&diagnostic.to_human_readable(file.content()));
        }
    }
    out
}

/// Print diagnostics: a JSON array on stdout, or graphical reports on stderr
pub(crate) fn print_diagnostics(
    path: &Path,
    source: &str,
    diagnostics: &[Diagnostic],
    json: bool,
) {
    if diagnostics.is_empty() {
        return;
    }
    if json {
        println!("{}", DiagnosticBag::from(diagnostics.to_vec()).to_json());
        return;
    }
    let file = SourceFile::new(path.to_path_buf(), source.to_string());
    eprint!("{}", render(&file, diagnostics, GraphicalTheme::default()));
}
