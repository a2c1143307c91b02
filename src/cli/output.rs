//! CLI output: error mapping and exit codes.

use crate::error::ApiError;
use crate::restore::RestoreReport;

/// Exit code of a restore that completed with entry-level failures
pub const EXIT_PARTIAL: i32 = 2;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    e.to_string()
}

/// 0 for a clean run, `EXIT_PARTIAL` when some entries failed.
pub fn exit_code(report: Option<&RestoreReport>) -> i32 {
    match report {
        Some(report) if !report.is_clean() => EXIT_PARTIAL,
        _ => 0,
    }
}
