//! Merge rules: defaults, override order.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("backup_root", ".")?
        .set_default("restore.existing_files", "overwrite")?
        .set_default("restore.preserve_mode", true)?
        .set_default("restore.preserve_ownership", true)
}
