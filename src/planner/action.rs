use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingest::model::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Remove,
    Replace,
    Extract,
    Refactor,
    Flag,
}

impl ActionType {
    pub const ALL: [ActionType; 5] = [
        ActionType::Remove,
        ActionType::Replace,
        ActionType::Extract,
        ActionType::Refactor,
        ActionType::Flag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Remove => "remove",
            ActionType::Replace => "replace",
            ActionType::Extract => "extract",
            ActionType::Refactor => "refactor",
            ActionType::Flag => "flag",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    /// May be applied without review.
    Safe,
    /// Usually safe, review recommended.
    SemiAuto,
    /// Needs a human decision.
    Manual,
}

impl SafetyLevel {
    pub const ALL: [SafetyLevel; 3] = [SafetyLevel::Safe, SafetyLevel::SemiAuto, SafetyLevel::Manual];

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyLevel::Safe => "safe",
            SafetyLevel::SemiAuto => "semi_auto",
            SafetyLevel::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One planned remediation, derived from exactly one finding.
///
/// `action_type` and `safety_level` are frozen when the plan is built;
/// the fix phase never consults the taxonomy again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescueAction {
    pub action_id: String,
    pub finding_id: String,
    pub rule_id: String,
    pub action_type: ActionType,
    pub safety_level: SafetyLevel,
    pub description: String,
    pub file_path: String,
    pub line_start: usize,
    pub line_end: usize,
    #[serde(default)]
    pub original_code: Option<String>,
    #[serde(default)]
    pub replacement_code: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl RescueAction {
    pub fn location(&self) -> Location {
        Location {
            path: self.file_path.clone(),
            line_start: self.line_start,
            line_end: self.line_end,
        }
    }

    /// Move the recorded range by `offset` lines, keeping its length.
    pub fn shift_lines(&mut self, offset: isize) {
        self.line_start = self.line_start.saturating_add_signed(offset);
        self.line_end = self.line_end.saturating_add_signed(offset);
    }
}
