//! Handler for the `mlang repl` subcommand.

use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::array::MArray;
use crate::interpreter::{MValue, Session};
use crate::parser::Program;

use super::host::host_externs;
use super::report::print_diagnostics;

const HELP: &str = "\
Commands:
  :quit, :q    Exit the REPL
  :help, :h    Show this help
  :vars        List the variables of the persistent scope
  :clear       Kill every local variable

Any other line runs as indented code, e.g. `s x=1 w x*2`.";

pub(crate) fn run_repl(file: Option<&Path>, json: bool) -> Result<bool, Box<dyn std::error::Error>> {
    let mut session = match file {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read file {}: {}", path.display(), e))?;
            match Session::load(&source, host_externs()) {
                Ok(session) => session,
                Err(bag) => {
                    print_diagnostics(path, &source, bag.diagnostics(), json);
                    return Ok(false);
                }
            }
        }
        None => Session::from_program(Program::default(), host_externs()),
    };

    println!("mlang {}", env!("CARGO_PKG_VERSION"));
    println!("Type M commands to run them. Use :quit to exit, :help for help.");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("M> ");
        io::stdout().flush()?;

        let Some(input) = lines.next() else { break };
        let input = input?;
        let input = input.trim_end();
        if input.trim().is_empty() {
            continue;
        }

        match input.trim() {
            ":quit" | ":q" | ":exit" => break,
            ":help" | ":h" => {
                println!("{HELP}");
                continue;
            }
            ":vars" => {
                for line in session
                    .variables()
                    .into_iter()
                    .flat_map(|(name, array)| format_variable(name, array))
                {
                    println!("{line}");
                }
                continue;
            }
            ":clear" => {
                session.clear_variables();
                println!("Cleared.");
                continue;
            }
            _ => {}
        }

        let evaluation = session.execute_line(input);
        if !evaluation.output.is_empty() {
            println!("{}", evaluation.output);
        }
        if json {
            if !evaluation.errors.is_empty() {
                println!("{}", serde_json::to_string(&evaluation.errors)?);
            }
        } else {
            print_diagnostics(Path::new("<repl>"), input, &evaluation.errors, false);
        }
    }

    println!("Bye!");
    Ok(true)
}

/// `name=value` and `name(sub,...)=value` for every defined node, in order
pub(crate) fn format_variable(name: &str, array: &MArray) -> Vec<String> {
    let mut lines = Vec::new();
    collect(name, &mut Vec::new(), array, &mut lines);
    lines
}

fn collect<'a>(name: &str, path: &mut Vec<&'a str>, node: &'a MArray, lines: &mut Vec<String>) {
    if !node.value.is_empty() {
        let reference = if path.is_empty() {
            name.to_string()
        } else {
            let subscripts: Vec<String> = path.iter().map(|key| quote_key(key)).collect();
            format!("{}({})", name, subscripts.join(","))
        };
        lines.push(format!("{}={}", reference, quote_value(&node.value)));
    }
    for (key, child) in node.children() {
        path.push(key);
        collect(name, path, child, lines);
        path.pop();
    }
}

fn quote_key(key: &str) -> String {
    quote_value(&MValue::from(key))
}

fn quote_value(value: &MValue) -> String {
    match value {
        MValue::Num(_) => value.to_string(),
        MValue::Str(s) if is_canonical_number(s) => s.clone(),
        MValue::Str(s) => format!("\"{}\"", s.replace('"', "\"\"")),
    }
}

fn is_canonical_number(s: &str) -> bool {
    let value = MValue::from(s);
    !s.is_empty() && MValue::Num(value.to_number()).to_string() == s
}
