//! Configuration System
//!
//! Layered configuration built with the `config` crate. Sources, lowest to
//! highest precedence: built-in defaults, the global file, the backup root's
//! `.jarvault/` files, then `JARVAULT__SECTION__KEY` environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::restore::{ExistingFilePolicy, RestoreEngine, UnixPermissions};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Hidden directory under the backup root holding per-root config files,
/// so it never shadows a jar
pub const CONFIG_DIR: &str = ".jarvault";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarvaultConfig {
    /// Directory holding one subdirectory per jar
    #[serde(default = "default_backup_root")]
    pub backup_root: PathBuf,

    #[serde(default)]
    pub restore: RestoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_backup_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for JarvaultConfig {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            restore: RestoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Restore behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreConfig {
    #[serde(default)]
    pub existing_files: ExistingFilePolicy,

    /// Apply recorded permission bits
    #[serde(default = "default_true")]
    pub preserve_mode: bool,

    /// Apply recorded uid/gid (usually needs root)
    #[serde(default = "default_true")]
    pub preserve_ownership: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            existing_files: ExistingFilePolicy::default(),
            preserve_mode: true,
            preserve_ownership: true,
        }
    }
}

impl RestoreConfig {
    pub fn permissions(&self) -> UnixPermissions {
        UnixPermissions {
            mode: self.preserve_mode,
            ownership: self.preserve_ownership,
        }
    }

    /// Restore engine configured from these settings
    pub fn engine(&self) -> RestoreEngine<UnixPermissions> {
        RestoreEngine::with_permissions(self.permissions()).existing_files(self.existing_files)
    }
}

impl JarvaultConfig {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.backup_root.as_os_str().is_empty() {
            return Err(ApiError::ConfigError("backup_root cannot be empty".to_string()));
        }
        const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];
        if !LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ApiError::ConfigError(format!(
                "Invalid log level: {} (must be one of {})",
                self.logging.level,
                LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

/// Loads `JarvaultConfig` from its layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the backup root `backup_root`.
    ///
    /// `backup_root` falls back into the result when no source sets it.
    pub fn load(backup_root: &Path) -> Result<JarvaultConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?
            .set_default("backup_root", backup_root.to_string_lossy().to_string())?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::root_file::add_to_builder(builder, backup_root)?;
        let builder = sources::environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }

    /// Load configuration from an explicit file (plus defaults and the
    /// environment), skipping the global and backup-root files.
    pub fn load_from_file(path: &Path) -> Result<JarvaultConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?
            .add_source(config::File::from(path).required(true));
        let builder = sources::environment::add_to_builder(builder);

        builder.build()?.try_deserialize()
    }
}
