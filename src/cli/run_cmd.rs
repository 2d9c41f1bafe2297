//! Handler for the `mlang run` subcommand.

use std::io::Write;
use std::path::Path;

use crate::config::{Config, RunConfig};
use crate::interpreter::{Evaluation, MValue, Session};

use super::host::host_externs;
use super::report::print_diagnostics;

/// Command-line overrides for the `[run]` table
#[derive(Debug, Default, Clone)]
pub(crate) struct RunOptions {
    pub(crate) entry: Option<String>,
    pub(crate) frames: Option<u32>,
    pub(crate) delta: Option<f64>,
}

impl RunOptions {
    pub(crate) fn apply(&self, config: &mut Config) {
        if let Some(entry) = &self.entry {
            config.run.entry = entry.clone();
        }
        if let Some(frames) = self.frames {
            config.run.frames = frames;
        }
        if let Some(delta) = self.delta {
            config.run.frame_delta = delta;
        }
    }
}

/// Run the entry tag once, then the frame tag `frames` times.
///
/// Returns `false` when any diagnostic was reported.
pub(crate) fn run_program(
    file: &Path,
    options: &RunOptions,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read file {}: {}", file.display(), e))?;

    let mut config = Config::discover(Some(file))?;
    options.apply(&mut config);
    let json = json || config.output.json;

    let mut session = match Session::load(&source, host_externs()) {
        Ok(session) => session,
        Err(bag) => {
            print_diagnostics(file, &source, bag.diagnostics(), json);
            return Ok(false);
        }
    };

    let mut stdout = std::io::stdout().lock();
    let explicit_entry = options.entry.is_some() || config.run.entry != RunConfig::default().entry;
    for evaluation in run_invocations(&mut session, &config, explicit_entry) {
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&evaluation)?)?;
        } else {
            write!(stdout, "{}", evaluation.output)?;
        }
        stdout.flush()?;

        if !evaluation.is_ok() {
            if !json {
                print_diagnostics(file, &source, &evaluation.errors, false);
            }
            return Ok(false);
        }
    }
    if !json {
        writeln!(stdout)?;
    }
    Ok(true)
}

/// Lazily yields the entry evaluation followed by each frame evaluation
pub(crate) fn run_invocations<'s>(
    session: &'s mut Session,
    config: &Config,
    explicit_entry: bool,
) -> Invocations<'s> {
    Invocations {
        session,
        entry: Some(config.run.entry.clone()),
        explicit_entry,
        frame_tag: config.run.frame_tag.clone(),
        frames_left: config.run.frames,
        delta: config.run.frame_delta,
    }
}

pub(crate) struct Invocations<'s> {
    session: &'s mut Session,
    entry: Option<String>,
    explicit_entry: bool,
    frame_tag: String,
    frames_left: u32,
    delta: f64,
}

impl Iterator for Invocations<'_> {
    type Item = Evaluation;

    fn next(&mut self) -> Option<Evaluation> {
        if let Some(entry) = self.entry.take() {
            // without a matching tag, fall back to the first command
            let evaluation = if self.explicit_entry || self.session.has_tag(&entry) {
                self.session.run_tag(&entry, &[])
            } else {
                self.session.run_main()
            };
            return Some(evaluation);
        }

        if self.frames_left == 0 {
            return None;
        }
        self.frames_left -= 1;
        Some(
            self.session
                .run_tag(&self.frame_tag, &[MValue::Num(self.delta)]),
        )
    }
}
