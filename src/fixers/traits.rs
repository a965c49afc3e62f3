use serde::Serialize;

use crate::planner::action::RescueAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixStatus {
    Success,
    Partial,
    Skipped,
    Failed,
}

/// Outcome of one fixer invocation. Lives only for the duration of a run.
#[derive(Debug, Clone)]
pub struct FixResult {
    pub status: FixStatus,
    pub action: RescueAction,
    pub original_content: Option<String>,
    pub modified_content: Option<String>,
    pub message: Option<String>,
}

impl FixResult {
    pub fn skipped(action: RescueAction, message: impl Into<String>) -> Self {
        Self {
            status: FixStatus::Skipped,
            action,
            original_content: None,
            modified_content: None,
            message: Some(message.into()),
        }
    }

    pub fn failed(action: RescueAction, message: impl Into<String>) -> Self {
        Self {
            status: FixStatus::Failed,
            action,
            original_content: None,
            modified_content: None,
            message: Some(message.into()),
        }
    }
}

/// Text produced by a fixer for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFix {
    /// Full file text after the fix.
    pub modified: String,
    /// The rewritten fragment, recorded on the action.
    pub replacement: String,
    pub rationale: String,
    /// Set when only part of the finding could be fixed.
    pub incomplete: Option<String>,
}

pub trait Fixer: Send + Sync {
    /// Rule IDs this fixer handles
    fn handles(&self) -> &[&str];

    fn can_fix(&self, action: &RescueAction) -> bool {
        self.handles().contains(&action.rule_id.as_str())
    }

    /// Whether the construct this action targets is found at `line` in `source`.
    /// The driver uses this to recover from line drift.
    fn probe(&self, action: &RescueAction, source: &str, line: usize) -> bool;

    /// Produce the fixed text, or `None` when no fix is possible.
    fn generate(&self, action: &RescueAction, source: &str) -> Option<GeneratedFix>;

    /// Generate the fix and record it on the action.
    fn apply(&self, mut action: RescueAction, source: &str) -> FixResult {
        if !self.can_fix(&action) {
            let message = format!("Fixer does not support rule: {}", action.rule_id);
            return FixResult::skipped(action, message);
        }

        let Some(fix) = self.generate(&action, source) else {
            return FixResult::failed(action, "Could not generate fix");
        };

        action.replacement_code = Some(fix.replacement);
        action.rationale = Some(fix.rationale);

        let (status, message) = match fix.incomplete {
            Some(note) => (FixStatus::Partial, note),
            None => (FixStatus::Success, "Fix generated".to_string()),
        };

        FixResult {
            status,
            action,
            original_content: Some(source.to_string()),
            modified_content: Some(fix.modified),
            message: Some(message),
        }
    }
}
