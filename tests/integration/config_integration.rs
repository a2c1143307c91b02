//! Layered configuration: files under the backup root and environment

use super::support::{file, JarBuilder};
use jarvault::cli::RunContext;
use jarvault::config::{ConfigLoader, CONFIG_DIR};
use jarvault::restore::ExistingFilePolicy;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch process environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn with_env<F: FnOnce()>(config_home: &Path, vars: &[(&str, &str)], f: F) {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let original_home = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", config_home);
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    f();

    for (key, _) in vars {
        std::env::remove_var(key);
    }
    match original_home {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_environment_overrides_root_file() {
    let builder = JarBuilder::new("home");
    let config_dir = builder.backup_root().join(CONFIG_DIR);
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[restore]\nexisting_files = \"overwrite\"\npreserve_mode = false\n",
    )
    .unwrap();
    let xdg = TempDir::new().unwrap();

    with_env(
        xdg.path(),
        &[("JARVAULT__RESTORE__EXISTING_FILES", "skip")],
        || {
            let config = ConfigLoader::load(builder.backup_root()).unwrap();
            assert_eq!(config.restore.existing_files, ExistingFilePolicy::Skip);
            assert!(!config.restore.preserve_mode);
            assert_eq!(config.backup_root, builder.backup_root());
        },
    );
}

#[test]
fn test_environment_specific_root_file() {
    let builder = JarBuilder::new("home");
    let config_dir = builder.backup_root().join(CONFIG_DIR);
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[logging]\nlevel = \"warn\"\n").unwrap();
    fs::write(config_dir.join("staging.toml"), "[logging]\nlevel = \"trace\"\n").unwrap();
    let xdg = TempDir::new().unwrap();

    with_env(xdg.path(), &[("JARVAULT_ENV", "staging")], || {
        let config = ConfigLoader::load(builder.backup_root()).unwrap();
        assert_eq!(config.logging.level, "trace");
    });
    with_env(xdg.path(), &[], || {
        let config = ConfigLoader::load(builder.backup_root()).unwrap();
        assert_eq!(config.logging.level, "warn");
    });
}

#[test]
fn test_skip_policy_from_config_drives_restore() {
    let mut builder = JarBuilder::new("home");
    let version_dir = builder.snapshot("202401010000", &[file("f.txt", "backup")]);
    let config_dir = builder.backup_root().join(CONFIG_DIR);
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[restore]\nexisting_files = \"skip\"\n").unwrap();
    let xdg = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(dest.path().join("f.txt"), b"local").unwrap();

    with_env(xdg.path(), &[], || {
        let ctx = RunContext::new(Some(builder.backup_root().to_path_buf()), None).unwrap();
        let output = ctx
            .execute(&jarvault::cli::Commands::Restore {
                index: version_dir.clone(),
                dest: dest.path().to_path_buf(),
                skip_existing: false,
                no_owner: false,
                key: None,
                format: "json".to_string(),
            })
            .unwrap();
        assert_eq!(output.report.unwrap().skipped, 1);
    });
    assert_eq!(fs::read(dest.path().join("f.txt")).unwrap(), b"local");
}

#[test]
fn test_invalid_config_is_rejected() {
    let builder = JarBuilder::new("home");
    let config_file = builder.backup_root().join("custom.toml");
    fs::write(&config_file, "[logging]\nlevel = \"chatty\"\n").unwrap();
    let xdg = TempDir::new().unwrap();

    with_env(xdg.path(), &[], || {
        assert!(RunContext::new(None, Some(config_file.clone())).is_err());
    });
}
