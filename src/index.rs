//! Per-version manifest
//!
//! Every version directory holds an `index.json` mapping each relative path
//! of the backed-up tree to its metadata and an optional content reference:
//!
//! ```json
//! {
//!   "docs":           { "mode": 493, "uid": 1000, "gid": 1000, "checksum": null, "timestamp": "202401010000" },
//!   "docs/notes.txt": { "mode": 420, "uid": 1000, "gid": 1000, "checksum": "af13...", "timestamp": "202401010000" }
//! }
//! ```
//!
//! `checksum: null` marks a directory. `timestamp` names the version whose
//! directory physically holds the blob, which may be older than the index.

use crate::cas::Checksum;
use crate::error::StorageError;
use crate::timestamp::Timestamp;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// File name of the manifest inside a version directory
pub const INDEX_FILE_NAME: &str = "index.json";

/// Metadata recorded for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Content hash; absent for directories
    #[serde(default)]
    pub checksum: Option<Checksum>,
    /// Version whose storage holds this entry's content
    #[serde(rename = "timestamp")]
    pub source_timestamp: Timestamp,
}

impl IndexEntry {
    pub fn directory(mode: u32, uid: u32, gid: u32, source_timestamp: Timestamp) -> Self {
        Self {
            mode,
            uid,
            gid,
            checksum: None,
            source_timestamp,
        }
    }

    pub fn file(
        mode: u32,
        uid: u32,
        gid: u32,
        checksum: Checksum,
        source_timestamp: Timestamp,
    ) -> Self {
        Self {
            mode,
            uid,
            gid,
            checksum: Some(checksum),
            source_timestamp,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.checksum.is_none()
    }
}

/// Manifest of one version: relative path -> entry, iterated in ascending
/// lexical path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `path`.
    ///
    /// Paths must be relative and must not climb out of the restore root.
    pub fn insert<S: Into<String>>(&mut self, path: S, entry: IndexEntry) -> Result<(), StorageError> {
        let path = path.into();
        validate_entry_path(&path).map_err(StorageError::InvalidLayout)?;
        self.entries.insert(path, entry);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending lexical order of path. A directory always comes
    /// before every path it prefixes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    /// Path of the manifest inside `version_dir`
    pub fn manifest_path(version_dir: &Path) -> PathBuf {
        version_dir.join(INDEX_FILE_NAME)
    }

    /// Load the manifest of `version_dir`.
    ///
    /// Fails with `IoError` if it cannot be read and `MalformedIndex` if it
    /// cannot be parsed.
    pub fn load(version_dir: &Path) -> Result<Self, StorageError> {
        let path = Self::manifest_path(version_dir);
        let bytes = fs::read(&path).map_err(|e| StorageError::io("read index", &path, e))?;

        let index: Index =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::MalformedIndex {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        debug!(path = %path.display(), entries = index.len(), "Loaded index");
        Ok(index)
    }

    /// Write the manifest into `version_dir` (atomic write).
    pub fn save(&self, version_dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(version_dir)
            .map_err(|e| StorageError::io("create version directory", version_dir, e))?;

        let path = Self::manifest_path(version_dir);
        let temp_path = path.with_extension("json.tmp");
        let serialized = serde_json::to_vec_pretty(self).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to serialize index: {}", e),
            ))
        })?;

        fs::write(&temp_path, serialized).map_err(|e| StorageError::io("write index", &temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::io("rename index into", &path, e)
        })?;

        debug!(path = %path.display(), entries = self.len(), "Saved index");
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IndexVisitor;

        impl<'de> Visitor<'de> for IndexVisitor {
            type Value = Index;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of relative paths to index entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Index, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = BTreeMap::new();
                while let Some((path, entry)) = map.next_entry::<String, IndexEntry>()? {
                    validate_entry_path(&path).map_err(de::Error::custom)?;
                    if entries.insert(path.clone(), entry).is_some() {
                        return Err(de::Error::custom(format!("duplicate path {:?}", path)));
                    }
                }
                Ok(Index { entries })
            }
        }

        deserializer.deserialize_map(IndexVisitor)
    }
}

fn validate_entry_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty path".to_string());
    }
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("path {:?} escapes the restore root", path));
            }
        }
    }
    Ok(())
}
