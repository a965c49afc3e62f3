//! Applies the safe actions of a rescue plan to files under a root directory.
//!
//! Files are processed independently. Within a file, actions run bottom-up
//! so an edit never moves the lines of actions still waiting above it.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::config::{DEFAULT_BACKUP_SUFFIX, DEFAULT_DRIFT_WINDOW};
use crate::planner::action::{RescueAction, SafetyLevel};
use crate::planner::RescuePlan;
use crate::utils::fs;

use super::registry::FixerRegistry;
use super::traits::{FixResult, FixStatus, Fixer};

#[derive(Debug, Clone)]
pub struct FixOptions {
    pub dry_run: bool,
    pub backup: bool,
    pub backup_suffix: String,
    pub drift_window: usize,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            dry_run: true,
            backup: false,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            drift_window: DEFAULT_DRIFT_WINDOW,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub applied: usize,
    pub errors: Vec<String>,
    pub results: Vec<FixResult>,
    pub written: bool,
    pub backup: Option<PathBuf>,
    /// Backup or write failure, also counted in `errors`.
    pub io_error: Option<String>,
}

impl FileReport {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            applied: 0,
            errors: Vec::new(),
            results: Vec::new(),
            written: false,
            backup: None,
            io_error: None,
        }
    }

    fn fail(&mut self, action: RescueAction, message: String) {
        self.errors.push(format!("[{}] {}", action.action_id, message));
        self.results.push(FixResult::failed(action, message));
    }

    fn record_io_error(&mut self, message: String) {
        warn!(file = %self.path, "{}", message);
        self.errors.push(message.clone());
        self.io_error = Some(message);
    }
}

#[derive(Debug, Default)]
pub struct FixRun {
    pub files: Vec<FileReport>,
    /// Safe actions no registered fixer handles.
    pub unsupported: Vec<FixResult>,
}

impl FixRun {
    pub fn applied(&self) -> usize {
        self.files.iter().map(|f| f.applied).sum()
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .flat_map(|f| f.errors.iter().map(String::as_str))
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.unsupported.is_empty()
    }
}

/// Actions eligible for automatic fixing: optional rule filter, then safe only.
pub fn select_actions(actions: &[RescueAction], rule: Option<&str>) -> Vec<RescueAction> {
    actions
        .iter()
        .filter(|a| rule.map_or(true, |r| a.rule_id == r))
        .filter(|a| a.safety_level == SafetyLevel::Safe)
        .cloned()
        .collect()
}

pub fn group_by_file(actions: Vec<RescueAction>) -> BTreeMap<String, Vec<RescueAction>> {
    let mut groups: BTreeMap<String, Vec<RescueAction>> = BTreeMap::new();
    for action in actions {
        groups.entry(action.file_path.clone()).or_default().push(action);
    }
    groups
}

/// Offsets to try around a recorded line, nearest first: -1, +1, -2, +2, ...
fn drift_offsets(window: usize) -> impl Iterator<Item = isize> {
    (1..=window as isize).flat_map(|d| [-d, d])
}

/// Offset from the recorded line at which the fixer recognizes its target.
fn locate_target(
    fixer: &dyn Fixer,
    action: &RescueAction,
    source: &str,
    window: usize,
) -> Option<isize> {
    if fixer.probe(action, source, action.line_start) {
        return Some(0);
    }
    drift_offsets(window).find(|&offset| {
        action
            .line_start
            .checked_add_signed(offset)
            .filter(|&line| line >= 1)
            .is_some_and(|line| fixer.probe(action, source, line))
    })
}

/// Apply every action for one file. `path` is the file on disk; `rel_path`
/// is the plan's relative path used in messages.
pub fn apply_fixes_to_file(
    path: &Path,
    rel_path: &str,
    mut actions: Vec<RescueAction>,
    registry: &FixerRegistry,
    options: &FixOptions,
) -> FileReport {
    let mut report = FileReport::new(rel_path);

    if !path.is_file() {
        warn!(file = %rel_path, "target file not found");
        for action in actions {
            report.fail(action, format!("File not found: {}", rel_path));
        }
        return report;
    }

    let original = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(file = %rel_path, error = %err, "could not read target file");
            for action in actions {
                report.fail(action, format!("Could not read {}: {}", rel_path, err));
            }
            return report;
        }
    };

    actions.sort_by(|a, b| {
        b.line_start
            .cmp(&a.line_start)
            .then_with(|| a.action_id.cmp(&b.action_id))
    });

    let mut current = original.clone();
    let mut fixed_lines: HashSet<usize> = HashSet::new();

    for mut action in actions {
        let Some(fixer) = registry.find_fixer(&action.rule_id) else {
            let message = format!("No fixer available for {}", action.rule_id);
            report.results.push(FixResult::skipped(action, message));
            continue;
        };

        if fixed_lines.contains(&action.line_start) {
            debug!(action = %action.action_id, line = action.line_start, "duplicate of an applied fix");
            let message = format!("Line {} already fixed", action.line_start);
            report.results.push(FixResult::skipped(action, message));
            continue;
        }

        let recorded = action.line_start;
        match locate_target(fixer, &action, &current, options.drift_window) {
            Some(0) => {}
            Some(offset) => {
                debug!(action = %action.action_id, recorded, offset, "target drifted");
                action.shift_lines(offset);
            }
            None => {
                let message = format!(
                    "Could not locate {} at {}:{} (searched ±{} lines)",
                    action.rule_id, rel_path, recorded, options.drift_window
                );
                report.fail(action, message);
                continue;
            }
        }

        let line = action.line_start;
        let result = fixer.apply(action, &current);
        match result.status {
            FixStatus::Success | FixStatus::Partial => {
                if let Some(text) = &result.modified_content {
                    current = text.clone();
                }
                report.applied += 1;
                fixed_lines.insert(recorded);
                fixed_lines.insert(line);
            }
            FixStatus::Failed => {
                report.errors.push(format!(
                    "[{}] {} at {}:{}",
                    result.action.action_id,
                    result.message.as_deref().unwrap_or("Fix failed"),
                    rel_path,
                    line
                ));
            }
            FixStatus::Skipped => {}
        }
        report.results.push(result);
    }

    if current == original || options.dry_run {
        return report;
    }

    if options.backup {
        match fs::backup_file(path, &options.backup_suffix) {
            Ok(backup) => {
                info!(file = %rel_path, backup = %backup.display(), "backup written");
                report.backup = Some(backup);
            }
            Err(err) => {
                report.record_io_error(format!("Could not back up {}: {}", rel_path, err));
                return report;
            }
        }
    }

    match fs::write_atomic(path, &current) {
        Ok(()) => {
            info!(file = %rel_path, applied = report.applied, "file updated");
            report.written = true;
        }
        Err(err) => report.record_io_error(format!("Could not write {}: {}", rel_path, err)),
    }

    report
}

/// Run every eligible action of `plan` against files under `root`.
/// `on_file` is called before each file is processed.
pub fn apply_plan<F>(
    plan: &RescuePlan,
    root: &Path,
    rule: Option<&str>,
    registry: &FixerRegistry,
    options: &FixOptions,
    mut on_file: F,
) -> FixRun
where
    F: FnMut(&str),
{
    let (supported, unsupported): (Vec<_>, Vec<_>) = select_actions(&plan.actions, rule)
        .into_iter()
        .partition(|a| registry.find_fixer(&a.rule_id).is_some());

    let mut run = FixRun {
        files: Vec::new(),
        unsupported: unsupported
            .into_iter()
            .map(|a| {
                let message = format!("No fixer available for {}", a.rule_id);
                FixResult::skipped(a, message)
            })
            .collect(),
    };

    for (file, actions) in group_by_file(supported) {
        on_file(&file);
        let report = apply_fixes_to_file(&root.join(&file), &file, actions, registry, options);
        run.files.push(report);
    }

    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixers::default_registry;
    use crate::planner::action::ActionType;
    use crate::planner::plan::PlanSummary;
    use crate::planner::RESCUE_PLAN_SCHEMA;
    use serde_json::Map;
    use std::fs as stdfs;
    use tempfile::TempDir;

    fn make_action(id: &str, rule: &str, safety: SafetyLevel, file: &str, line: usize) -> RescueAction {
        RescueAction {
            action_id: id.to_string(),
            finding_id: format!("f-{}", id),
            rule_id: rule.to_string(),
            action_type: ActionType::Replace,
            safety_level: safety,
            description: "test action".to_string(),
            file_path: file.to_string(),
            line_start: line,
            line_end: line,
            original_code: None,
            replacement_code: None,
            rationale: None,
            metadata: Map::new(),
        }
    }

    fn mutable(id: &str, file: &str, line: usize) -> RescueAction {
        make_action(id, "GST_MUTABLE_DEFAULT_001", SafetyLevel::Safe, file, line)
    }

    fn make_plan(actions: Vec<RescueAction>) -> RescuePlan {
        let summary = PlanSummary::calculate(&actions);
        RescuePlan {
            schema_version: RESCUE_PLAN_SCHEMA.to_string(),
            source_run_id: "run-1".to_string(),
            source_signal_logic_version: "v1".to_string(),
            actions,
            summary,
        }
    }

    fn applying() -> FixOptions {
        FixOptions {
            dry_run: false,
            ..FixOptions::default()
        }
    }

    fn padded_source() -> String {
        let mut lines: Vec<String> = (1..=40).map(|i| format!("x{} = {}", i, i)).collect();
        lines[9] = "def first(items=[]):".to_string();
        lines[10] = "    return items".to_string();
        lines[29] = "def second(data={}):".to_string();
        lines[30] = "    return data".to_string();
        lines.join("\n") + "\n"
    }

    #[test]
    fn test_select_actions_filters_rule_then_safety() {
        let actions = vec![
            mutable("A0000", "a.py", 1),
            make_action("A0001", "SEC_EVAL_001", SafetyLevel::Manual, "a.py", 2),
            make_action("A0002", "DC_UNREACHABLE_001", SafetyLevel::Safe, "a.py", 3),
            make_action("A0003", "GST_MUTABLE_DEFAULT_001", SafetyLevel::SemiAuto, "a.py", 4),
        ];
        let ids: Vec<String> = select_actions(&actions, None)
            .into_iter()
            .map(|a| a.action_id)
            .collect();
        assert_eq!(ids, vec!["A0000", "A0002"]);

        let only = select_actions(&actions, Some("DC_UNREACHABLE_001"));
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].action_id, "A0002");
    }

    #[test]
    fn test_group_by_file_is_sorted() {
        let groups = group_by_file(vec![
            mutable("A0000", "z.py", 1),
            mutable("A0001", "a.py", 1),
            mutable("A0002", "z.py", 5),
        ]);
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["a.py", "z.py"]);
        assert_eq!(groups["z.py"].len(), 2);
    }

    #[test]
    fn test_drift_offsets_nearest_first() {
        let offsets: Vec<isize> = drift_offsets(3).collect();
        assert_eq!(offsets, vec![-1, 1, -2, 2, -3, 3]);
        assert_eq!(drift_offsets(0).count(), 0);
    }

    #[test]
    fn test_applies_both_declarations_in_one_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        stdfs::write(&file, padded_source()).unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 10), mutable("A0001", "mod.py", 30)]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert_eq!(run.applied(), 2);
        assert_eq!(run.error_count(), 0);
        let text = stdfs::read_to_string(&file).unwrap();
        assert!(text.contains("def first(items=None):\n    if items is None:\n        items = []\n"));
        assert!(text.contains("def second(data=None):\n    if data is None:\n        data = {}\n"));
    }

    #[test]
    fn test_recovers_from_drifted_lines() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        stdfs::write(&file, padded_source()).unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 12), mutable("A0001", "mod.py", 28)]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert_eq!(run.applied(), 2);
        let results = &run.files[0].results;
        let lines: Vec<usize> = results.iter().map(|r| r.action.line_start).collect();
        assert_eq!(lines, vec![30, 10]);
    }

    #[test]
    fn test_drift_beyond_window_is_an_error() {
        let tmp = TempDir::new().unwrap();
        stdfs::write(tmp.path().join("mod.py"), padded_source()).unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 15)]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert_eq!(run.applied(), 0);
        assert_eq!(run.error_count(), 1);
        assert!(run.errors().next().unwrap().contains("Could not locate"));
    }

    #[test]
    fn test_missing_file_records_error_per_action() {
        let tmp = TempDir::new().unwrap();
        let plan = make_plan(vec![mutable("A0000", "gone.py", 1), mutable("A0001", "gone.py", 5)]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert_eq!(run.error_count(), 2);
        assert!(run.errors().all(|e| e.contains("File not found")));
    }

    #[test]
    fn test_dry_run_leaves_file_untouched() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        let source = "def foo(items=[]):\n    return items\n";
        stdfs::write(&file, source).unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 1)]);
        let options = FixOptions {
            backup: true,
            ..FixOptions::default()
        };
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &options, |_| {});

        assert_eq!(run.applied(), 1);
        assert!(!run.files[0].written);
        assert_eq!(stdfs::read_to_string(&file).unwrap(), source);
        assert!(!tmp.path().join("mod.py.bak").exists());
        assert!(run.files[0].results[0].action.replacement_code.is_some());
    }

    #[test]
    fn test_backup_written_before_modifying() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        let source = "def foo(items=[]):\n    return items\n";
        stdfs::write(&file, source).unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 1)]);
        let options = FixOptions {
            backup: true,
            ..applying()
        };
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &options, |_| {});

        assert!(run.files[0].written);
        assert_eq!(stdfs::read_to_string(tmp.path().join("mod.py.bak")).unwrap(), source);
        assert!(stdfs::read_to_string(&file).unwrap().contains("items=None"));
    }

    #[test]
    fn test_duplicate_action_is_skipped() {
        let tmp = TempDir::new().unwrap();
        stdfs::write(tmp.path().join("mod.py"), "def foo(items=[]):\n    return items\n").unwrap();

        let plan = make_plan(vec![mutable("A0000", "mod.py", 1), mutable("A0001", "mod.py", 1)]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert_eq!(run.applied(), 1);
        assert_eq!(run.error_count(), 0);
        assert_eq!(run.files[0].results[1].status, FixStatus::Skipped);
    }

    #[test]
    fn test_unsupported_safe_rule_is_skipped_not_error() {
        let tmp = TempDir::new().unwrap();
        let plan = make_plan(vec![make_action(
            "A0000",
            "SEC_YAML_UNSAFE_001",
            SafetyLevel::Safe,
            "cfg.py",
            3,
        )]);
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |_| {});

        assert!(run.files.is_empty());
        assert_eq!(run.unsupported.len(), 1);
        assert_eq!(run.error_count(), 0);
    }

    #[test]
    fn test_mixed_fixers_on_same_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mod.py");
        stdfs::write(
            &file,
            "def foo(items=[]):\n    return items\n    print('dead')\n",
        )
        .unwrap();

        let mut dead = make_action("A0001", "DC_UNREACHABLE_001", SafetyLevel::Safe, "mod.py", 3);
        dead.original_code = Some("print('dead')".to_string());
        let plan = make_plan(vec![mutable("A0000", "mod.py", 1), dead]);
        let mut seen = Vec::new();
        let run = apply_plan(&plan, tmp.path(), None, &default_registry(), &applying(), |f| {
            seen.push(f.to_string())
        });

        assert_eq!(seen, vec!["mod.py"]);
        assert_eq!(run.applied(), 2);
        assert_eq!(
            stdfs::read_to_string(&file).unwrap(),
            "def foo(items=None):\n    if items is None:\n        items = []\n    return items\n"
        );
    }
}
