//! CLI presentation: text and json formatters.

use crate::restore::RestoreReport;
use crate::timestamp::Timestamp;
use owo_colors::OwoColorize;
use std::path::Path;

/// Failures listed in text output before eliding the rest
const MAX_LISTED_FAILURES: usize = 10;

pub fn format_restore_report_text(report: &RestoreReport, destination: &Path, color: bool) -> String {
    let mut out = if report.is_clean() {
        let headline = format!(
            "Restored {} files and {} directories into {}",
            report.files,
            report.directories,
            destination.display()
        );
        if color {
            headline.green().to_string()
        } else {
            headline
        }
    } else {
        let headline = format!(
            "Restored {} files and {} directories into {} with {} errors",
            report.files,
            report.directories,
            destination.display(),
            report.failures.len()
        );
        if color {
            headline.yellow().to_string()
        } else {
            headline
        }
    };

    if report.skipped > 0 {
        out.push_str(&format!("\n  Skipped {} existing files", report.skipped));
    }

    for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
        let line = format!("{} ({}): {}", failure.path, failure.kind, failure.message);
        if color {
            out.push_str(&format!("\n  {}", line.red()));
        } else {
            out.push_str(&format!("\n  {}", line));
        }
    }
    if report.failures.len() > MAX_LISTED_FAILURES {
        out.push_str(&format!(
            "\n  ... and {} more",
            report.failures.len() - MAX_LISTED_FAILURES
        ));
    }

    out
}

pub fn format_restore_report_json(report: &RestoreReport, destination: &Path) -> String {
    let failures: Vec<serde_json::Value> = report
        .failures
        .iter()
        .map(|failure| {
            serde_json::json!({
                "path": failure.path,
                "kind": failure.kind.to_string(),
                "message": failure.message,
            })
        })
        .collect();

    let out = serde_json::json!({
        "destination": destination.display().to_string(),
        "processed": report.processed,
        "files": report.files,
        "directories": report.directories,
        "skipped": report.skipped,
        "failures": failures,
    });
    serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string())
}

pub fn format_versions(title: &str, versions: &[Timestamp]) -> String {
    if versions.is_empty() {
        return format!("{}: none", title);
    }
    let mut lines = vec![format!("{}:", title)];
    lines.extend(versions.iter().map(|version| format!("  {}", version)));
    lines.join("\n")
}
