//! Snapshot and diff versions and their on-disk layout
//!
//! Layout under a jar root:
//!
//! ```text
//! <jar_root>/<snapshot_ts>/                   snapshot directory
//! <jar_root>/<snapshot_ts>/diff/<diff_ts>/    diff directory
//! ```
//!
//! Each version directory holds one `index.json` and flat blob files.

use crate::error::StorageError;
use crate::index::INDEX_FILE_NAME;
use crate::timestamp::Timestamp;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the directory nesting a snapshot's diffs
pub const DIFF_DIR: &str = "diff";

/// A restorable version of a jar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Version {
    /// Full backup living directly under the jar root
    Snapshot { ts: Timestamp },
    /// Incremental backup nested under its owning snapshot
    Diff { snapshot_ts: Timestamp, ts: Timestamp },
}

impl Version {
    pub fn snapshot(ts: Timestamp) -> Self {
        Version::Snapshot { ts }
    }

    pub fn diff(snapshot_ts: Timestamp, ts: Timestamp) -> Self {
        Version::Diff { snapshot_ts, ts }
    }

    /// Timestamp naming this version's own directory
    pub fn timestamp(&self) -> &Timestamp {
        match self {
            Version::Snapshot { ts } | Version::Diff { ts, .. } => ts,
        }
    }

    /// Timestamp of the snapshot rooting this version's chain
    pub fn snapshot_timestamp(&self) -> &Timestamp {
        match self {
            Version::Snapshot { ts } => ts,
            Version::Diff { snapshot_ts, .. } => snapshot_ts,
        }
    }

    pub fn is_diff(&self) -> bool {
        matches!(self, Version::Diff { .. })
    }

    pub fn directory(&self, jar_root: &Path) -> PathBuf {
        match self {
            Version::Snapshot { ts } => jar_root.join(ts.as_str()),
            Version::Diff { snapshot_ts, ts } => diffs_directory(jar_root, snapshot_ts).join(ts.as_str()),
        }
    }

    pub fn snapshot_directory(&self, jar_root: &Path) -> PathBuf {
        jar_root.join(self.snapshot_timestamp().as_str())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Snapshot { ts } => write!(f, "snapshot {}", ts),
            Version::Diff { snapshot_ts, ts } => write!(f, "diff {} of snapshot {}", ts, snapshot_ts),
        }
    }
}

/// Directory holding every diff of the snapshot `snapshot_ts`
pub fn diffs_directory(jar_root: &Path, snapshot_ts: &Timestamp) -> PathBuf {
    jar_root.join(snapshot_ts.as_str()).join(DIFF_DIR)
}

/// A version together with the jar it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLocation {
    pub jar_root: PathBuf,
    pub version: Version,
}

impl VersionLocation {
    /// Derive jar root and version kind from an index location.
    ///
    /// `location` may be a version directory or the `index.json` inside it.
    /// The path is canonicalized first, so it must exist.
    pub fn parse(location: &Path) -> Result<Self, StorageError> {
        let canonical = dunce::canonicalize(location)
            .map_err(|e| StorageError::io("resolve index location", location, e))?;

        let version_dir = if canonical.file_name().and_then(|n| n.to_str()) == Some(INDEX_FILE_NAME) {
            parent_of(&canonical)?
        } else {
            canonical
        };

        let ts = timestamp_name(&version_dir)?;
        let parent = parent_of(&version_dir)?;

        // A jar may itself be named `diff`; only `<snapshot_ts>/diff/<ts>`
        // is a diff.
        if parent.file_name().and_then(|n| n.to_str()) == Some(DIFF_DIR) {
            if let Some(snapshot_dir) = parent.parent() {
                if let Ok(snapshot_ts) = timestamp_name(snapshot_dir) {
                    return Ok(Self {
                        jar_root: parent_of(snapshot_dir)?,
                        version: Version::diff(snapshot_ts, ts),
                    });
                }
            }
        }

        Ok(Self {
            jar_root: parent,
            version: Version::snapshot(ts),
        })
    }

    pub fn directory(&self) -> PathBuf {
        self.version.directory(&self.jar_root)
    }
}

fn parent_of(path: &Path) -> Result<PathBuf, StorageError> {
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| StorageError::InvalidLayout(format!("{:?} has no parent directory", path)))
}

fn timestamp_name(path: &Path) -> Result<Timestamp, StorageError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::InvalidLayout(format!("{:?} has no version name", path)))?;
    Timestamp::parse(name).map_err(|_| {
        StorageError::InvalidLayout(format!("{:?} is not a version directory", path))
    })
}
