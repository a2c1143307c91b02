//! Backup-root config file source: .jarvault/config.toml and .jarvault/{env}.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use crate::config::CONFIG_DIR;
use std::path::Path;

/// Add backup-root config files to builder.
/// Precedence: .jarvault/config.toml (base) then .jarvault/{JARVAULT_ENV}.toml.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    backup_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = backup_root.join(CONFIG_DIR);
    let env_name = std::env::var("JARVAULT_ENV").unwrap_or_else(|_| "production".to_string());

    let mut builder = builder;

    let base_config_path = config_dir.join("config.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path.as_path()).required(false));
    }

    let env_config_path = config_dir.join(format!("{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path.as_path()).required(false));
    }

    Ok(builder)
}
