use std::{env, process};

use anyhow::Result;
use clap::Parser;
use steelcut::cli::{self, Args};

pub fn main() -> Result<()> {
    let filters = env::var("RUST_LOG").unwrap_or_else(|_| "error,steelcut=info".to_owned());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let args = parse_args();
    cli::run(&args)
}

#[allow(clippy::exit)]
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Nowhere left to report a failure to print the usage message.
            err.print().ok();
            process::exit(usage_exit_code(&err));
        }
    }
}

/// Usage errors exit with 1 rather than clap's default of 2; `--help` and
/// `--version` still exit with 0.
fn usage_exit_code(err: &clap::Error) -> i32 {
    i32::from(err.use_stderr())
}
