use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::planner::taxonomy::RulePolicy;
use crate::planner::Taxonomy;

pub const CONFIG_FILE: &str = ".code-rescue.yml";
pub const DEFAULT_DRIFT_WINDOW: usize = 3;
pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Lines searched on each side of a recorded location when it has drifted.
    pub drift_window: Option<usize>,
    pub backup_suffix: Option<String>,
    /// Extra or replacement rule policies, keyed by rule id.
    #[serde(default)]
    pub rules: BTreeMap<String, RulePolicy>,
}

impl Config {
    /// Reads `.code-rescue.yml` from `dir`. A missing or unreadable file
    /// yields the defaults.
    pub fn load(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Config::default();
        }
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_yaml::from_str::<Config>(&content) {
                Ok(config) => {
                    debug!(path = %config_path.display(), "loaded config");
                    config
                }
                Err(err) => {
                    warn!(path = %config_path.display(), error = %err, "ignoring malformed config");
                    Config::default()
                }
            },
            Err(err) => {
                warn!(path = %config_path.display(), error = %err, "could not read config");
                Config::default()
            }
        }
    }

    pub fn taxonomy(&self) -> Taxonomy {
        Taxonomy::with_overrides(&self.rules)
    }

    pub fn drift_window(&self) -> usize {
        self.drift_window.unwrap_or(DEFAULT_DRIFT_WINDOW)
    }

    pub fn backup_suffix(&self) -> &str {
        self.backup_suffix
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BACKUP_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::action::{ActionType, SafetyLevel};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.drift_window(), 3);
        assert_eq!(config.backup_suffix(), ".bak");
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = TempDir::new().unwrap();
        let yaml = "\
drift_window: 5
backup_suffix: .orig
rules:
  SEC_EVAL_001:
    action_type: flag
    safety_level: manual
  LINT_TRAILING_001:
    action_type: remove
    safety_level: semi_auto
    rationale: Trailing whitespace.
";
        fs::write(tmp.path().join(CONFIG_FILE), yaml).unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.drift_window(), 5);
        assert_eq!(config.backup_suffix(), ".orig");

        let taxonomy = config.taxonomy();
        assert_eq!(
            taxonomy.classify("SEC_EVAL_001"),
            (ActionType::Flag, SafetyLevel::Manual)
        );
        assert_eq!(
            taxonomy.classify("LINT_TRAILING_001"),
            (ActionType::Remove, SafetyLevel::SemiAuto)
        );
        assert_eq!(taxonomy.rationale("LINT_TRAILING_001"), "Trailing whitespace.");
    }

    #[test]
    fn test_malformed_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "drift_window: [not, a, number]\n").unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.drift_window(), DEFAULT_DRIFT_WINDOW);
    }
}
