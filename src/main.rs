//! Promptpipe: file-to-file prompt completion against a local quantized model.
//!
//! This is the main entry point for the `promptpipe` CLI. It parses arguments,
//! merges the config file with flag overrides, loads the model backend, runs
//! the single completion pass, and handles errors with proper exit codes.

mod cli;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod generate;
pub mod runner;
pub mod template;

use cli::Cli;
use config::PipeConfig;
use error::Result;
use generate::LlamaGenerator;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            // Return appropriate exit code
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = PipeConfig::load(&cli.config)?.unwrap_or_default();
    config.apply_cli(cli);
    config.validate()?;

    let mut generator = LlamaGenerator::load(&config.model)?;

    runner::run(
        &cli.input,
        &cli.output,
        &mut generator,
        &config.template,
        &config.sampling,
    )
}
