pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "code-rescue",
    version,
    about = "Turn analysis findings into a prioritized rescue plan and apply the safe fixes"
)]
pub struct Cli {
    /// Show debug logs on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a rescue plan from a run_result document
    Plan(commands::plan::PlanArgs),
    /// Apply the safe actions of a rescue plan
    Fix(commands::fix::FixArgs),
}
