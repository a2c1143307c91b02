//! CLI route: single route table and run context. Dispatches to the library
//! services and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_restore_report_json, format_restore_report_text, format_versions,
};
use crate::config::{ConfigLoader, JarvaultConfig};
use crate::crypto::Cipher;
use crate::error::{ApiError, StorageError};
use crate::jar::{list_jars, Jar};
use crate::restore::{ExistingFilePolicy, RestoreReport};
use crate::timestamp::Timestamp;
use chrono::NaiveDate;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of one command
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    /// Set by `restore`
    pub report: Option<RestoreReport>,
}

impl CommandOutput {
    fn text(text: String) -> Self {
        Self { text, report: None }
    }
}

/// Runtime context for CLI execution: resolved configuration.
pub struct RunContext {
    config: JarvaultConfig,
    color: bool,
}

impl RunContext {
    /// Create run context from an optional backup root and config path.
    pub fn new(root: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let mut config = match (&config_path, &root) {
            (Some(path), _) => ConfigLoader::load_from_file(path)?,
            (None, Some(root)) => ConfigLoader::load(root)?,
            (None, None) => ConfigLoader::load(Path::new("."))?,
        };
        if let Some(root) = root {
            config.backup_root = root;
        }
        config.validate()?;

        Ok(Self::with_config(config))
    }

    pub fn with_config(config: JarvaultConfig) -> Self {
        Self {
            config,
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn config(&self) -> &JarvaultConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ApiError> {
        match command {
            Commands::Restore {
                index,
                dest,
                skip_existing,
                no_owner,
                key,
                format,
            } => self.restore(index, dest, *skip_existing, *no_owner, key.as_deref(), format),
            Commands::Jars => {
                let jars = list_jars(&self.config.backup_root)?;
                if jars.is_empty() {
                    return Ok(CommandOutput::text("No jars found".to_string()));
                }
                let names: Vec<String> = jars.iter().map(Jar::name).collect();
                Ok(CommandOutput::text(names.join("\n")))
            }
            Commands::Versions { jar } => {
                let versions = self.jar(jar).versions()?;
                Ok(CommandOutput::text(format_versions("Snapshots", &versions)))
            }
            Commands::Latest { jar } => {
                let text = match self.jar(jar).latest_version()? {
                    Some(version) => version.to_string(),
                    None => "No versions".to_string(),
                };
                Ok(CommandOutput::text(text))
            }
            Commands::Diffs { jar, snapshot } => {
                let jar = self.jar(jar);
                let snapshot = match snapshot {
                    Some(snapshot) => Timestamp::parse(snapshot)?,
                    None => match jar.latest()? {
                        Some(latest) => latest,
                        None => return Ok(CommandOutput::text("No versions".to_string())),
                    },
                };
                let diffs = jar.diff_versions(&snapshot)?;
                Ok(CommandOutput::text(format_versions(
                    &format!("Diffs of {}", snapshot),
                    &diffs,
                )))
            }
            Commands::Window {
                jar,
                snapshot,
                start,
                end,
            } => {
                let snapshot = Timestamp::parse(snapshot)?;
                let start = parse_window_bound(start, false)?;
                let end = parse_window_bound(end, true)?;
                let text = match self.jar(jar).latest_diff_in_window(&snapshot, &start, &end)? {
                    Some(diff) => diff.to_string(),
                    None => format!("No diff of {} between {} and {}", snapshot, start, end),
                };
                Ok(CommandOutput::text(text))
            }
        }
    }

    fn restore(
        &self,
        index: &Path,
        dest: &Path,
        skip_existing: bool,
        no_owner: bool,
        key: Option<&str>,
        format: &str,
    ) -> Result<CommandOutput, ApiError> {
        let mut restore_config = self.config.restore.clone();
        if skip_existing {
            restore_config.existing_files = ExistingFilePolicy::Skip;
        }
        if no_owner {
            restore_config.preserve_ownership = false;
        }

        let mut engine = restore_config.engine();
        if let Some(key) = key {
            engine = engine.cipher(parse_key(key)?);
        }
        let report = engine.restore_from(dest, index)?;
        info!(
            failures = report.failures.len(),
            destination = %dest.display(),
            "Restore command completed"
        );

        let text = match format {
            "json" => format_restore_report_json(&report, dest),
            _ => format_restore_report_text(&report, dest, self.color),
        };
        Ok(CommandOutput {
            text,
            report: Some(report),
        })
    }

    fn jar(&self, jar: &Path) -> Jar {
        Jar::open(self.config.backup_root.join(jar))
    }
}

fn parse_key(key: &str) -> Result<Cipher, ApiError> {
    let bytes = hex::decode(key.trim())
        .map_err(|e| ApiError::ConfigError(format!("Key is not valid hex: {}", e)))?;
    Ok(Cipher::new(&bytes)?)
}

/// Parse a window bound given as a timestamp or a `YYYY-MM-DD` date. A date
/// covers the whole day: start of day for `start`, last minute for `end`.
fn parse_window_bound(value: &str, end: bool) -> Result<Timestamp, ApiError> {
    if let Ok(timestamp) = Timestamp::parse(value) {
        return Ok(timestamp);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        StorageError::InvalidTimestamp(format!(
            "{:?} is neither YYYYMMDDHHMM nor YYYY-MM-DD",
            value
        ))
    })?;
    let (hour, minute) = if end { (23, 59) } else { (0, 0) };
    let datetime = date.and_hms_opt(hour, minute, 0).ok_or_else(|| {
        StorageError::InvalidTimestamp(format!("{:?} has no {:02}:{:02}", value, hour, minute))
    })?;
    Ok(Timestamp::from_datetime(datetime))
}
