//! mlang CLI - runs and checks M programs

use std::process::ExitCode;

use mlang::cli::{init_tracing, Cli};

fn main() -> ExitCode {
    init_tracing();

    match Cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
