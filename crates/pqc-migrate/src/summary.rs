// ABOUTME: Renders the end-of-run summary printed by the pqc-migrate binary.
// ABOUTME: One headline per outcome followed by the steps that were entered.

use crate::orchestrator::{MigrationOutcome, MigrationReport, MigrationState};
use colored::Colorize;

/// Build the summary text. Colors follow the `colored` global override.
pub fn render(report: &MigrationReport) -> String {
    let mut lines = Vec::new();

    let headline = match &report.outcome {
        MigrationOutcome::Complete => "Migration complete".green().bold().to_string(),
        MigrationOutcome::RollbackAttempted { .. } => {
            "New key rejected, backup restored".yellow().bold().to_string()
        }
        MigrationOutcome::Aborted { .. } => "Migration aborted".yellow().bold().to_string(),
        MigrationOutcome::Fatal { .. } => "Migration failed".red().bold().to_string(),
    };
    lines.push(headline);

    match &report.outcome {
        MigrationOutcome::Complete => {}
        MigrationOutcome::RollbackAttempted { reason, restore } => {
            lines.push(format!("  Reason:   {}", reason));
            lines.push(format!(
                "  Restored: {} key file(s), sshd_config {}",
                restore.restored.len(),
                if restore.config_restored { "restored" } else { "not restored" }
            ));
            if !restore.skipped.is_empty() {
                lines.push(format!("  Left in backup: {}", restore.skipped.len()));
            }
            for error in &restore.errors {
                lines.push(format!("  {} {}", "!".red(), error));
            }
        }
        MigrationOutcome::Aborted { state, reason } | MigrationOutcome::Fatal { state, reason } => {
            lines.push(format!("  Step:   {}", state));
            lines.push(format!("  Reason: {}", reason));
        }
    }

    if let Some(backup) = &report.backup {
        lines.push(format!("  Backed up: {} file(s)", backup.moved.len()));
        if let Some(error) = &backup.error {
            lines.push(format!("  {} backup incomplete: {}", "!".yellow(), error));
        }
    }

    lines.push(String::new());
    for state in MigrationState::ALL {
        let marker = if report.visited.last() == Some(&state) && report.outcome != MigrationOutcome::Complete {
            "✗".red().to_string()
        } else if report.visited.contains(&state) {
            "✓".green().to_string()
        } else {
            "-".dimmed().to_string()
        };
        lines.push(format!("  {} {}", marker, state.description()));
    }

    lines.join("\n")
}
