use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::cli::output::OutputFormatter;
use crate::cli::progress::FixProgress;
use crate::core::config::Config;
use crate::core::RescueError;
use crate::fixers::default_registry;
use crate::fixers::driver::{apply_plan, FixOptions};
use crate::planner::{RescuePlan, RESCUE_PLAN_SCHEMA};

#[derive(Args, Debug)]
pub struct FixArgs {
    /// Rescue plan produced by `code-rescue plan`
    pub plan: PathBuf,

    /// Directory the plan's file paths are relative to
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Write changes to disk (without it nothing is modified)
    #[arg(long)]
    pub apply: bool,

    /// Copy each file to <file>.bak before modifying it
    #[arg(long)]
    pub backup: bool,

    /// Only fix actions for this rule id (e.g. GST_MUTABLE_DEFAULT_001)
    #[arg(long)]
    pub rule: Option<String>,

    /// Lines searched around a recorded location that has drifted
    #[arg(long)]
    pub drift_window: Option<usize>,
}

async fn load_plan(path: &Path) -> Result<RescuePlan, RescueError> {
    if !path.is_file() {
        return Err(RescueError::PlanNotFound(path.to_path_buf()));
    }
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RescueError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let plan: RescuePlan =
        serde_json::from_str(&raw).map_err(|e| RescueError::InvalidPlan(e.to_string()))?;
    if plan.schema_version != RESCUE_PLAN_SCHEMA {
        return Err(RescueError::InvalidPlan(format!(
            "expected schema_version \"{}\", found \"{}\"",
            RESCUE_PLAN_SCHEMA, plan.schema_version
        )));
    }
    Ok(plan)
}

pub async fn execute(args: &FixArgs) -> Result<ExitCode> {
    let plan = load_plan(&args.plan).await?;
    if !args.root.is_dir() {
        return Err(RescueError::RootNotFound(args.root.clone()).into());
    }

    let config = Config::load(&args.root);
    let options = FixOptions {
        dry_run: !args.apply,
        backup: args.backup,
        backup_suffix: config.backup_suffix().to_string(),
        drift_window: args.drift_window.unwrap_or_else(|| config.drift_window()),
    };
    let registry = default_registry();

    let progress = FixProgress::new();
    let run = apply_plan(
        &plan,
        &args.root,
        args.rule.as_deref(),
        &registry,
        &options,
        |file| progress.set_file(file),
    );
    progress.finish();

    if run.is_empty() {
        println!(
            "{}",
            "No safe fixes available for the supported rules.".green()
        );
        println!(
            "  Plan has {} action(s); supported rules: {}",
            plan.actions.len(),
            registry.supported_rules().join(", ")
        );
        return Ok(ExitCode::SUCCESS);
    }

    if options.dry_run {
        println!("{}", "Dry run: no files will be modified.".cyan());
    }
    OutputFormatter::new(options.dry_run).display(&run);

    info!(
        applied = run.applied(),
        errors = run.error_count(),
        dry_run = options.dry_run,
        "fix run finished"
    );

    if run.error_count() > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
