//! Handlers for the `mlang check` and `mlang ast` subcommands.

use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostic;
use crate::parser::parse_source;

use super::report::print_diagnostics;

/// Source file extension picked up when checking a directory
pub(crate) const SOURCE_EXTENSION: &str = "m";

/// Tokenize and parse every file, reporting diagnostics.
///
/// Returns `false` when any file has errors.
pub(crate) fn run_check(
    paths: &[PathBuf],
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let files = collect_sources(paths)?;
    let mut total_errors = 0;

    for file in &files {
        let source = std::fs::read_to_string(file)
            .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
        let diagnostics = check_source(&source);
        total_errors += diagnostics.len();
        print_diagnostics(file, &source, &diagnostics, json);
    }

    if total_errors > 0 {
        if !json {
            eprintln!(
                "\nChecked {} file(s), found {} error(s)",
                files.len(),
                total_errors
            );
        }
        Ok(false)
    } else {
        if !json {
            println!("Checked {} file(s), no errors found", files.len());
        }
        Ok(true)
    }
}

/// Print the parsed program as pretty JSON
pub(crate) fn run_ast(file: &Path, json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    match parse_source(&source) {
        Ok(program) => {
            println!("{}", serde_json::to_string_pretty(&program)?);
            Ok(true)
        }
        Err(bag) => {
            print_diagnostics(file, &source, bag.diagnostics(), json);
            Ok(false)
        }
    }
}

/// Diagnostics of the tokenize and parse stages
pub(crate) fn check_source(source: &str) -> Vec<Diagnostic> {
    match parse_source(source) {
        Ok(_) => Vec::new(),
        Err(bag) => bag.take(),
    }
}

/// Expand directories into the `.m` files they contain, sorted
pub(crate) fn collect_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(
                walkdir(path)?
                    .into_iter()
                    .filter(|entry| entry.extension().is_some_and(|ext| ext == SOURCE_EXTENSION)),
            );
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    Ok(files)
}

fn walkdir(path: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut results = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() {
            results.push(entry_path);
        } else if entry_path.is_dir() {
            results.extend(walkdir(&entry_path)?);
        }
    }
    Ok(results)
}
