use crate::planner::action::RescueAction;

use super::python::parses_cleanly;
use super::traits::{Fixer, GeneratedFix};

pub const UNREACHABLE_RULE: &str = "DC_UNREACHABLE_001";
pub const IF_FALSE_RULE: &str = "DC_IF_FALSE_001";

/// Removes the lines a dead-code finding spans.
///
/// A span that starts on a block header takes the whole block with it. When
/// the removal leaves a block header with no body, a `pass` statement is put
/// in its place. Output that no longer parses is declined.
pub struct DeadCodeFixer;

fn indent_of(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn is_code(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

/// First non-blank line of the recorded snippet, trimmed.
fn snippet_head(action: &RescueAction) -> Option<&str> {
    action
        .original_code
        .as_deref()?
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
}

impl DeadCodeFixer {
    fn span_len(action: &RescueAction) -> Option<usize> {
        if action.line_start == 0 {
            return None;
        }
        action.line_end.checked_sub(action.line_start)
    }

    /// End of the removal. A span opening on a block header extends through
    /// the last following line indented deeper than the header.
    fn removal_end(lines: &[&str], start: usize, end: usize) -> usize {
        let header = lines[start];
        if !header.trim_end().ends_with(':') {
            return end;
        }
        let depth = indent_of(header).len();
        let mut stop = end;
        for (idx, line) in lines.iter().enumerate().skip(end) {
            if line.trim().is_empty() {
                continue;
            }
            if indent_of(line).len() <= depth {
                break;
            }
            stop = idx + 1;
        }
        stop
    }

    /// Whether removing `start..end` leaves the enclosing block empty.
    fn empties_block(lines: &[&str], start: usize, end: usize) -> bool {
        let Some(header) = lines[..start].iter().rev().find(|l| is_code(l)) else {
            return false;
        };
        if !header.trim_end().ends_with(':') {
            return false;
        }
        let header_indent = indent_of(header).len();
        if indent_of(lines[start]).len() <= header_indent {
            return false;
        }
        match lines[end..].iter().find(|l| is_code(l)) {
            Some(next) => indent_of(next).len() <= header_indent,
            None => true,
        }
    }
}

impl Fixer for DeadCodeFixer {
    fn handles(&self) -> &[&str] {
        &[UNREACHABLE_RULE, IF_FALSE_RULE]
    }

    fn probe(&self, action: &RescueAction, source: &str, line: usize) -> bool {
        let Some(len) = Self::span_len(action) else {
            return false;
        };
        let lines: Vec<&str> = source.lines().collect();
        if line == 0 || line + len > lines.len() {
            return false;
        }
        let first = lines[line - 1].trim();
        if first.is_empty() {
            return false;
        }
        snippet_head(action).map_or(true, |expected| first == expected)
    }

    fn generate(&self, action: &RescueAction, source: &str) -> Option<GeneratedFix> {
        if !self.probe(action, source, action.line_start) {
            return None;
        }

        let lines: Vec<&str> = source.split_inclusive('\n').collect();
        let start = action.line_start - 1;
        let end = Self::removal_end(&lines, start, action.line_end);

        let replacement = if Self::empties_block(&lines, start, end) {
            let newline = if lines[start].ends_with("\r\n") { "\r\n" } else { "\n" };
            format!("{}pass{}", indent_of(lines[start]), newline)
        } else {
            String::new()
        };

        let mut modified = lines[..start].concat();
        modified.push_str(&replacement);
        modified.push_str(&lines[end..].concat());
        if !parses_cleanly(&modified) {
            return None;
        }

        let removed = end - start;
        let rationale = if action.rule_id == IF_FALSE_RULE {
            format!("Removed 'if False:' block ({} line(s)) that can never execute.", removed)
        } else {
            format!(
                "Removed {} unreachable line(s) following a return, raise, break or continue.",
                removed
            )
        };

        Some(GeneratedFix {
            modified,
            replacement,
            rationale,
            incomplete: None,
        })
    }
}
