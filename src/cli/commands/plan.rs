use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::core::config::Config;
use crate::core::RescueError;
use crate::ingest::{load_run_result, RUN_RESULT_SCHEMA};
use crate::planner::create_rescue_plan;
use crate::reporters::{JsonReporter, Reporter, TextReporter};

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// run_result JSON document ("-" reads stdin)
    pub input: String,

    /// Where to write the plan ("-" for stdout)
    #[arg(long, short, default_value = "-")]
    pub output: String,

    /// Print a readable plan report instead of the JSON artifact
    #[arg(long)]
    pub dry_run: bool,
}

async fn read_input(input: &str) -> Result<String, RescueError> {
    if input == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .map_err(|source| RescueError::Read {
                path: PathBuf::from("<stdin>"),
                source,
            })?;
        return Ok(buf);
    }

    let path = Path::new(input);
    if !path.is_file() {
        return Err(RescueError::InputNotFound(path.to_path_buf()));
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| RescueError::Read {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn execute(args: &PlanArgs) -> Result<ExitCode> {
    let raw = read_input(&args.input).await?;
    let document: serde_json::Value = serde_json::from_str(&raw).map_err(RescueError::from)?;
    let run_result =
        load_run_result(&document).ok_or(RescueError::SchemaMismatch(RUN_RESULT_SCHEMA))?;

    let config = Config::load(Path::new("."));
    let plan = create_rescue_plan(&run_result, &config.taxonomy());
    info!(
        findings = run_result.findings.len(),
        actions = plan.actions.len(),
        "plan built"
    );

    if args.dry_run {
        print!("{}", TextReporter::new(&run_result).generate(&plan)?);
        return Ok(ExitCode::SUCCESS);
    }

    let reporter = JsonReporter;
    let content = reporter.generate(&plan)?;
    if args.output == "-" {
        print!("{}", content);
    } else {
        tokio::fs::write(&args.output, &content).await?;
        eprintln!(
            "{} {} plan written to {} ({} action(s))",
            "DONE".green(),
            reporter.name(),
            args.output.bold(),
            plan.actions.len()
        );
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const RUN_RESULT: &str = r#"{
        "schema_version": "run_result_v1",
        "run": {"run_id": "run-1", "signal_logic_version": "v1"},
        "findings_raw": [{
            "finding_id": "f-1",
            "type": "global_state",
            "severity": "high",
            "message": "Mutable default argument",
            "location": {"path": "app.py", "line_start": 1, "line_end": 1},
            "confidence": 0.9,
            "rule_id": "GST_MUTABLE_DEFAULT_001"
        }],
        "signals_snapshot": [],
        "summary": {}
    }"#;

    fn args(input: &Path, output: &Path) -> PlanArgs {
        PlanArgs {
            input: input.to_string_lossy().to_string(),
            output: output.to_string_lossy().to_string(),
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_writes_plan_file() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("run.json");
        let output = tmp.path().join("plan.json");
        fs::write(&input, RUN_RESULT).unwrap();

        let code = execute(&args(&input, &output)).await.unwrap();
        assert_eq!(code, ExitCode::SUCCESS);

        let plan: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(plan["schema_version"], "rescue_plan_v1");
        assert_eq!(plan["actions"][0]["rule_id"], "GST_MUTABLE_DEFAULT_001");
        assert_eq!(plan["actions"][0]["safety_level"], "safe");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("run.json");
        let output = tmp.path().join("plan.json");
        fs::write(&input, RUN_RESULT).unwrap();

        let mut plan_args = args(&input, &output);
        plan_args.dry_run = true;
        execute(&plan_args).await.unwrap();
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_rescue_error() {
        let tmp = TempDir::new().unwrap();
        let err = execute(&args(&tmp.path().join("nope.json"), &tmp.path().join("out.json")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RescueError>(),
            Some(RescueError::InputNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_rescue_error() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("run.json");
        fs::write(&input, r#"{"schema_version": "run_result_v2"}"#).unwrap();

        let err = execute(&args(&input, &tmp.path().join("out.json")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RescueError>(),
            Some(RescueError::SchemaMismatch(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_json_is_rescue_error() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("run.json");
        fs::write(&input, "{not json").unwrap();

        let err = execute(&args(&input, &tmp.path().join("out.json")))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RescueError>(),
            Some(RescueError::InvalidJson(_))
        ));
    }
}
