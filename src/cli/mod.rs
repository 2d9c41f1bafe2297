//! Command-line interface for the mlang interpreter
//!
//! Provides commands: run, check, ast, repl, explain

mod check_cmd;
mod explain_cmd;
mod host;
mod repl_cmd;
mod report;
mod run_cmd;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Once;

pub use host::host_externs;

use run_cmd::RunOptions;

/// mlang - an interpreter for a tag-addressable M dialect
#[derive(Parser, Debug)]
#[command(name = "mlang")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output diagnostics as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program: the entry tag, then the frame tag once per frame
    Run {
        /// File to run
        file: PathBuf,

        /// Tag to start at (defaults to `main`, or the first command)
        #[arg(long)]
        entry: Option<String>,

        /// Number of frame tag invocations after the entry tag
        #[arg(long)]
        frames: Option<u32>,

        /// Delta-time argument passed to each frame invocation, in seconds
        #[arg(long)]
        delta: Option<f64>,
    },

    /// Tokenize and parse without running
    Check {
        /// Files or directories to check
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,
    },

    /// Print the parsed program as JSON
    Ast {
        /// File to parse
        file: PathBuf,
    },

    /// Start an interactive direct-mode session
    Repl {
        /// Program whose tags the session can call
        file: Option<PathBuf>,
    },

    /// Explain an error code in detail
    Explain {
        /// Error code to explain (e.g., E1002, E4001)
        code: String,
    },
}

impl Cli {
    /// Parse arguments and run the CLI
    pub fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
        Cli::parse().execute()
    }

    /// Run an already-parsed command line
    pub fn execute(self) -> Result<ExitCode, Box<dyn std::error::Error>> {
        let ok = match self.command {
            Command::Run {
                file,
                entry,
                frames,
                delta,
            } => {
                let options = RunOptions {
                    entry,
                    frames,
                    delta,
                };
                run_cmd::run_program(&file, &options, self.json)?
            }
            Command::Check { paths } => check_cmd::run_check(&paths, self.json)?,
            Command::Ast { file } => check_cmd::run_ast(&file, self.json)?,
            Command::Repl { file } => repl_cmd::run_repl(file.as_deref(), self.json)?,
            Command::Explain { code } => explain_cmd::run_explain(&code)?,
        };

        Ok(if ok {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber.
///
/// Safe to call multiple times. Logging is enabled only when `RUST_LOG` is
/// set (e.g. `RUST_LOG=mlang=debug`) and goes to stderr.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
