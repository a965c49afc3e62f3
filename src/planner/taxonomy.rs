//! Rule policy table: rule id → action type, safety level and rationale.
//!
//! The table is built once per invocation (built-ins plus config overrides)
//! and only read afterwards. Unknown rules always map to `flag`/`manual`;
//! that fallback is not configurable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::action::{ActionType, SafetyLevel};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePolicy {
    pub action_type: ActionType,
    pub safety_level: SafetyLevel,
    #[serde(default)]
    pub rationale: Option<String>,
}

const BUILTIN_RULES: &[(&str, ActionType, SafetyLevel, &str)] = &[
    (
        "DC_UNREACHABLE_001",
        ActionType::Remove,
        SafetyLevel::Safe,
        "Code after return/raise/break/continue never executes.",
    ),
    (
        "DC_IF_FALSE_001",
        ActionType::Remove,
        SafetyLevel::Safe,
        "Code inside 'if False:' block never executes.",
    ),
    (
        "DC_ASSERT_FALSE_001",
        ActionType::Flag,
        SafetyLevel::Manual,
        "assert False always fails - may be intentional placeholder.",
    ),
    (
        "GST_MUTABLE_DEFAULT_001",
        ActionType::Replace,
        SafetyLevel::Safe,
        "Mutable default arguments are shared across calls.",
    ),
    (
        "GST_MUTABLE_MODULE_001",
        ActionType::Flag,
        SafetyLevel::Manual,
        "Module-level mutable state can cause unexpected behavior.",
    ),
    (
        "GST_GLOBAL_KEYWORD_001",
        ActionType::Refactor,
        SafetyLevel::Manual,
        "Global keyword creates hidden dependencies.",
    ),
    (
        "SEC_HARDCODED_SECRET_001",
        ActionType::Extract,
        SafetyLevel::SemiAuto,
        "Hardcoded secrets should be extracted to environment variables.",
    ),
    (
        "SEC_EVAL_001",
        ActionType::Replace,
        SafetyLevel::Manual,
        "eval() can execute arbitrary code - use ast.literal_eval() if possible.",
    ),
    (
        "SEC_SUBPROCESS_SHELL_001",
        ActionType::Replace,
        SafetyLevel::SemiAuto,
        "shell=True is vulnerable to command injection.",
    ),
    (
        "SEC_SQL_INJECTION_001",
        ActionType::Replace,
        SafetyLevel::SemiAuto,
        "String formatting in SQL is vulnerable to injection.",
    ),
    (
        "SEC_PICKLE_LOAD_001",
        ActionType::Flag,
        SafetyLevel::Manual,
        "pickle.load() can execute arbitrary code from untrusted data.",
    ),
    (
        "SEC_YAML_UNSAFE_001",
        ActionType::Replace,
        SafetyLevel::Safe,
        "yaml.load() without SafeLoader can execute arbitrary code.",
    ),
    (
        "EXC_SWALLOW_001",
        ActionType::Flag,
        SafetyLevel::Manual,
        "Silently swallowed exceptions hide failures.",
    ),
    (
        "EXC_BROAD_LOGGED_001",
        ActionType::Flag,
        SafetyLevel::Manual,
        "Broad exception handlers mask unrelated errors.",
    ),
];

#[derive(Debug, Clone)]
pub struct Taxonomy {
    rules: BTreeMap<String, RulePolicy>,
}

impl Taxonomy {
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(id, action_type, safety_level, rationale)| {
                (
                    id.to_string(),
                    RulePolicy {
                        action_type: *action_type,
                        safety_level: *safety_level,
                        rationale: Some(rationale.to_string()),
                    },
                )
            })
            .collect();
        Self { rules }
    }

    /// Built-in table extended with (and overridden by) `overrides`.
    ///
    /// An override without a rationale keeps the built-in text, if any.
    pub fn with_overrides(overrides: &BTreeMap<String, RulePolicy>) -> Self {
        let mut taxonomy = Self::builtin();
        for (id, policy) in overrides {
            let rationale = policy
                .rationale
                .clone()
                .or_else(|| taxonomy.rules.get(id).and_then(|p| p.rationale.clone()));
            taxonomy.rules.insert(
                id.clone(),
                RulePolicy {
                    action_type: policy.action_type,
                    safety_level: policy.safety_level,
                    rationale,
                },
            );
        }
        taxonomy
    }

    pub fn classify(&self, rule_id: &str) -> (ActionType, SafetyLevel) {
        self.rules
            .get(rule_id)
            .map(|p| (p.action_type, p.safety_level))
            .unwrap_or((ActionType::Flag, SafetyLevel::Manual))
    }

    pub fn rationale(&self, rule_id: &str) -> String {
        self.rules
            .get(rule_id)
            .and_then(|p| p.rationale.clone())
            .unwrap_or_else(|| format!("Rule {} triggered - review recommended.", rule_id))
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}
