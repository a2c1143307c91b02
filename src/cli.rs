//! CLI domain: parse, route, output and presentation only.
//! Restore and query logic lives in the library modules.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error, EXIT_PARTIAL};
pub use parse::{Cli, Commands};
pub use presentation::{format_restore_report_json, format_restore_report_text, format_versions};
pub use route::{CommandOutput, RunContext};
