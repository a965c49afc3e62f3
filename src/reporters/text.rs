use std::fmt::Write as _;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::ingest::model::{RunMetadata, RunResult, Signal};
use crate::planner::action::{ActionType, SafetyLevel};
use crate::planner::RescuePlan;
use crate::reporters::traits::Reporter;

/// Human-readable plan report printed by `plan --dry-run`.
pub struct TextReporter {
    input_schema: String,
    run: RunMetadata,
    signals: Vec<Signal>,
    upstream_summary: Map<String, Value>,
}

impl TextReporter {
    pub fn new(run_result: &RunResult) -> Self {
        Self {
            input_schema: run_result.schema_version.clone(),
            run: run_result.run.clone(),
            signals: run_result.signals.clone(),
            upstream_summary: run_result.summary.clone(),
        }
    }
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

impl Reporter for TextReporter {
    fn name(&self) -> &str {
        "text"
    }

    fn generate(&self, plan: &RescuePlan) -> Result<String> {
        let mut out = String::with_capacity(1024);
        let summary = &plan.summary;

        writeln!(out, "Rescue plan ({})", plan.schema_version)?;
        writeln!(
            out,
            "  Source run:     {} (signal logic {})",
            or_dash(&plan.source_run_id),
            or_dash(&plan.source_signal_logic_version)
        )?;
        writeln!(
            out,
            "  Engine:         {} / tool {}",
            or_dash(&self.run.engine_version),
            or_dash(&self.run.tool_version)
        )?;
        writeln!(out, "  Input:          {}", self.input_schema)?;
        for (key, value) in &self.upstream_summary {
            if let Value::Number(n) = value {
                writeln!(out, "    {}: {}", key, n)?;
            }
        }
        writeln!(out, "  Signals:        {}", self.signals.len())?;
        for signal in &self.signals {
            writeln!(
                out,
                "    {} {} (risk {}, urgency {}, {} evidence item(s))",
                signal.signal_id,
                signal.kind,
                signal.risk_level,
                signal.urgency,
                signal.evidence.len()
            )?;
        }
        writeln!(out)?;

        writeln!(out, "Summary")?;
        writeln!(out, "  Total actions:  {}", summary.total_actions)?;
        writeln!(out, "  Auto-fixable:   {}", summary.auto_fixable)?;
        writeln!(out, "  Manual review:  {}", summary.manual_review)?;
        writeln!(out)?;

        writeln!(out, "By safety level")?;
        for level in SafetyLevel::ALL {
            let count = summary.by_safety_level.get(&level).copied().unwrap_or(0);
            writeln!(out, "  {:<10} {}", level, count)?;
        }
        writeln!(out)?;

        writeln!(out, "By action type")?;
        for kind in ActionType::ALL {
            let count = summary.by_action_type.get(&kind).copied().unwrap_or(0);
            writeln!(out, "  {:<10} {}", kind, count)?;
        }

        if !summary.by_rule_id.is_empty() {
            writeln!(out)?;
            writeln!(out, "By rule")?;
            for (rule, count) in &summary.by_rule_id {
                writeln!(out, "  {:<28} {}", rule, count)?;
            }
        }

        if !plan.actions.is_empty() {
            writeln!(out)?;
            writeln!(out, "Actions")?;
            for action in &plan.actions {
                let location = action.location();
                writeln!(
                    out,
                    "  {} [{}] {} {} {}:{}",
                    action.action_id,
                    action.safety_level,
                    action.action_type,
                    action.rule_id,
                    location.path,
                    location.line_start
                )?;
                writeln!(out, "        {}", action.description)?;
            }
        }

        Ok(out)
    }
}
