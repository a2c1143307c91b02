//! CLI parse: clap types for jarvault. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Jarvault CLI - restore and inspect versioned directory backups
#[derive(Parser, Debug)]
#[command(name = "jarvault")]
#[command(about = "Restore and inspect versioned, content-addressed directory backups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backup root holding one directory per jar (overrides configuration)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable logging
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore a version into a destination directory
    Restore {
        /// Version directory (or its index.json) to restore
        index: PathBuf,
        /// Destination directory
        #[arg(long)]
        dest: PathBuf,
        /// Leave files that already exist in the destination untouched
        #[arg(long)]
        skip_existing: bool,
        /// Do not apply recorded uid/gid
        #[arg(long)]
        no_owner: bool,
        /// Hex-encoded 32 byte key for blobs encrypted at rest
        #[arg(long, env = "JARVAULT_KEY", hide_env_values = true)]
        key: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List jars under the backup root
    Jars,
    /// List snapshot versions of a jar
    Versions {
        /// Jar name under the backup root, or a path to the jar
        jar: PathBuf,
    },
    /// Show the latest restorable version of a jar
    Latest {
        jar: PathBuf,
    },
    /// List diffs of a snapshot (default: latest snapshot)
    Diffs {
        jar: PathBuf,
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Show the latest diff of a snapshot within a date window
    Window {
        jar: PathBuf,
        /// Snapshot timestamp (YYYYMMDDHHMM)
        #[arg(long)]
        snapshot: String,
        /// Window start (YYYYMMDDHHMM or YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Window end, inclusive (YYYYMMDDHHMM or YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}
