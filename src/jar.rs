//! Jar queries
//!
//! A backup root holds one directory per jar. Each jar holds its snapshots
//! directly, and each snapshot nests its diffs under `diff/`.

use crate::error::StorageError;
use crate::timestamp::{self, Timestamp};
use crate::version::{diffs_directory, Version};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Handle on one independently versioned backup target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jar {
    root: PathBuf,
}

impl Jar {
    pub fn open<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory name of the jar under its backup root
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Snapshot versions, oldest first
    pub fn versions(&self) -> Result<Vec<Timestamp>, StorageError> {
        timestamp::list_versions(&self.root)
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Result<Option<Timestamp>, StorageError> {
        timestamp::last(&self.root)
    }

    /// Diffs of `snapshot`, oldest first
    pub fn diff_versions(&self, snapshot: &Timestamp) -> Result<Vec<Timestamp>, StorageError> {
        timestamp::list_versions(&diffs_directory(&self.root, snapshot))
    }

    pub fn has_diff(&self, snapshot: &Timestamp) -> Result<bool, StorageError> {
        Ok(!self.diff_versions(snapshot)?.is_empty())
    }

    /// Latest diff of `snapshot` whose timestamp lies within `[start, end]`
    pub fn latest_diff_in_window(
        &self,
        snapshot: &Timestamp,
        start: &Timestamp,
        end: &Timestamp,
    ) -> Result<Option<Timestamp>, StorageError> {
        let diffs = self.diff_versions(snapshot)?;
        Ok(timestamp::latest_in_window(&diffs, start, end).cloned())
    }

    /// Most recent restorable version: the newest diff of the newest
    /// snapshot, or that snapshot itself when it has no diffs.
    pub fn latest_version(&self) -> Result<Option<Version>, StorageError> {
        let Some(snapshot) = self.latest()? else {
            return Ok(None);
        };
        match self.diff_versions(&snapshot)?.pop() {
            Some(diff) => Ok(Some(Version::diff(snapshot, diff))),
            None => Ok(Some(Version::snapshot(snapshot))),
        }
    }

    pub fn version_dir(&self, version: &Version) -> PathBuf {
        version.directory(&self.root)
    }
}

/// Every jar under a backup root, sorted by name. Hidden directories,
/// including the root's `.jarvault` config directory, are not jars.
pub fn list_jars(backup_root: &Path) -> Result<Vec<Jar>, StorageError> {
    let read_dir = match fs::read_dir(backup_root) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io("list jars in", backup_root, e)),
    };

    let mut jars = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| StorageError::io("list jars in", backup_root, e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| StorageError::io("stat", &path, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if file_type.is_dir() && !name.starts_with('.') {
            jars.push(Jar::open(path));
        }
    }

    jars.sort_by(|a, b| a.root.cmp(&b.root));
    Ok(jars)
}
