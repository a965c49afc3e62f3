use colored::*;

use crate::fixers::driver::{FileReport, FixRun};
use crate::fixers::traits::{FixResult, FixStatus};

/// ` (+2 lines)` style note on how much a fix grew or shrank the file.
fn line_delta(result: &FixResult) -> String {
    match (&result.original_content, &result.modified_content) {
        (Some(before), Some(after)) => {
            let delta = after.lines().count() as isize - before.lines().count() as isize;
            if delta == 0 {
                String::new()
            } else {
                format!(" ({:+} lines)", delta)
            }
        }
        _ => String::new(),
    }
}

pub struct OutputFormatter {
    dry_run: bool,
}

impl OutputFormatter {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn display(&self, run: &FixRun) {
        for file in &run.files {
            self.display_file(file);
        }

        if !run.unsupported.is_empty() {
            println!();
            println!("  {}", "No fixer available".bold());
            for result in &run.unsupported {
                self.display_result(result);
            }
        }

        println!();
        println!("{}", "─".repeat(64));
        let errors = run.error_count();
        let error_text = format!("{} error(s)", errors);
        let error_text = if errors > 0 {
            error_text.red().to_string()
        } else {
            error_text
        };

        if self.dry_run {
            println!(
                "{} fix(es) would be applied, {}.",
                run.applied().to_string().bold(),
                error_text
            );
            if run.applied() > 0 {
                println!("{}", "Re-run with --apply to write changes.".dimmed());
            }
        } else {
            println!(
                "{} fixed, {}.",
                run.applied().to_string().bold(),
                error_text
            );
        }
    }

    fn display_file(&self, file: &FileReport) {
        println!();
        println!("  {}", file.path.cyan().bold());
        for result in &file.results {
            self.display_result(result);
        }
        if file.written {
            println!("    {} {}", "Written:".dimmed(), file.path);
        }
        if let Some(backup) = &file.backup {
            println!("    {} {}", "Backup:".dimmed(), backup.display());
        }
        if let Some(err) = &file.io_error {
            println!("    {} {}", "ERROR".red(), err);
        }
    }

    fn display_result(&self, result: &FixResult) {
        let action = &result.action;
        let message = result.message.as_deref().unwrap_or_default();
        let head = format!(
            "[{}] {} line {}",
            action.action_id, action.rule_id, action.line_start
        );

        match result.status {
            FixStatus::Success | FixStatus::Partial => {
                let label = match (self.dry_run, result.status) {
                    (true, _) => "DRY-RUN".cyan(),
                    (false, FixStatus::Partial) => "PARTIAL".yellow(),
                    (false, _) => "FIXED".green(),
                };
                println!(
                    "    {} {} {}{}",
                    label,
                    head,
                    action.rationale.as_deref().unwrap_or(message),
                    line_delta(result).dimmed()
                );
                if result.status == FixStatus::Partial {
                    println!("        {}", message.yellow());
                }
                if self.dry_run {
                    if let Some(code) = &action.replacement_code {
                        for line in code.lines() {
                            println!("        {}", line.dimmed());
                        }
                    }
                }
            }
            FixStatus::Skipped => println!("    {} {} {}", "SKIP".yellow(), head, message),
            FixStatus::Failed => println!("    {} {} {}", "ERROR".red(), head, message),
        }
    }
}
