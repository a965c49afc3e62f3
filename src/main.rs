mod cli;
mod core;
mod fixers;
mod ingest;
mod planner;
mod reporters;
mod utils;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use crate::core::RescueError;

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "code_rescue=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match &cli.command {
        Commands::Plan(args) => cli::commands::plan::execute(args).await,
        Commands::Fix(args) => cli::commands::fix::execute(args).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            if err.downcast_ref::<RescueError>().is_some() {
                ExitCode::from(RescueError::EXIT_CODE)
            } else {
                ExitCode::from(1)
            }
        }
    }
}
