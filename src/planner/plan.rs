use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingest::model::{Finding, RunResult};

use super::action::{ActionType, RescueAction, SafetyLevel};
use super::taxonomy::Taxonomy;

pub const RESCUE_PLAN_SCHEMA: &str = "rescue_plan_v1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_actions: usize,
    pub by_safety_level: BTreeMap<SafetyLevel, usize>,
    pub by_action_type: BTreeMap<ActionType, usize>,
    pub by_rule_id: BTreeMap<String, usize>,
    pub auto_fixable: usize,
    pub manual_review: usize,
}

impl PlanSummary {
    pub fn calculate(actions: &[RescueAction]) -> Self {
        let mut by_safety_level: BTreeMap<SafetyLevel, usize> =
            SafetyLevel::ALL.iter().map(|level| (*level, 0)).collect();
        let mut by_action_type: BTreeMap<ActionType, usize> =
            ActionType::ALL.iter().map(|kind| (*kind, 0)).collect();
        let mut by_rule_id: BTreeMap<String, usize> = BTreeMap::new();

        for action in actions {
            *by_safety_level.entry(action.safety_level).or_default() += 1;
            *by_action_type.entry(action.action_type).or_default() += 1;
            *by_rule_id.entry(action.rule_id.clone()).or_default() += 1;
        }

        let count = |level: SafetyLevel| by_safety_level.get(&level).copied().unwrap_or(0);
        let auto_fixable = count(SafetyLevel::Safe) + count(SafetyLevel::SemiAuto);
        let manual_review = count(SafetyLevel::Manual);

        Self {
            total_actions: actions.len(),
            by_safety_level,
            by_action_type,
            by_rule_id,
            auto_fixable,
            manual_review,
        }
    }
}

/// Prioritized rescue plan. `actions` order is the canonical priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescuePlan {
    pub schema_version: String,
    #[serde(default)]
    pub source_run_id: String,
    #[serde(default)]
    pub source_signal_logic_version: String,
    pub actions: Vec<RescueAction>,
    #[serde(default)]
    pub summary: PlanSummary,
}

/// Ordering key: severity desc, confidence desc, path asc, line asc, then
/// input position so the order is total.
fn priority_key(index: usize, finding: &Finding) -> (std::cmp::Reverse<(u8, i64)>, &str, usize, usize) {
    (
        std::cmp::Reverse((finding.severity.rank(), finding.confidence_score())),
        finding.location.path.as_str(),
        finding.location.line_start,
        index,
    )
}

fn action_from_finding(finding: &Finding, number: usize, taxonomy: &Taxonomy) -> RescueAction {
    let rule_id = finding.resolved_rule_id();
    let (action_type, safety_level) = taxonomy.classify(&rule_id);
    let rationale = taxonomy.rationale(&rule_id);

    RescueAction {
        action_id: format!("A{:04}", number),
        finding_id: finding.finding_id.clone(),
        rule_id,
        action_type,
        safety_level,
        description: finding.message.clone(),
        file_path: finding.location.path.clone(),
        line_start: finding.location.line_start,
        line_end: finding.location.line_end,
        original_code: finding.snippet.clone(),
        replacement_code: None,
        rationale: Some(rationale),
        metadata: finding.metadata.clone(),
    }
}

pub fn create_rescue_plan(run_result: &RunResult, taxonomy: &Taxonomy) -> RescuePlan {
    let mut ordered: Vec<(usize, &Finding)> = run_result.findings.iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| priority_key(*ia, a).cmp(&priority_key(*ib, b)));

    let actions: Vec<RescueAction> = ordered
        .into_iter()
        .enumerate()
        .map(|(number, (_, finding))| action_from_finding(finding, number, taxonomy))
        .collect();

    let summary = PlanSummary::calculate(&actions);

    RescuePlan {
        schema_version: RESCUE_PLAN_SCHEMA.to_string(),
        source_run_id: run_result.run.run_id.clone(),
        source_signal_logic_version: run_result.run.signal_logic_version.clone(),
        actions,
        summary,
    }
}
