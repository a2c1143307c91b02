//! Fixture jars laid out the way the jar writer does: every version gets an
//! `index.json`, and a version only stores blobs for content that changed
//! since the previous version of its chain.

use jarvault::cas::{compute_content_hash, BlobStore};
use jarvault::crypto::Cipher;
use jarvault::index::{Index, IndexEntry};
use jarvault::timestamp::Timestamp;
use jarvault::version::Version;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const FILE_MODE: u32 = 0o100644;
pub const DIR_MODE: u32 = 0o040755;

pub fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

/// One path of a fixture tree; `content: None` is a directory
#[derive(Debug, Clone)]
pub struct FixtureEntry {
    pub path: String,
    pub content: Option<Vec<u8>>,
}

pub fn dir(path: &str) -> FixtureEntry {
    FixtureEntry {
        path: path.to_string(),
        content: None,
    }
}

pub fn file(path: &str, content: &str) -> FixtureEntry {
    FixtureEntry {
        path: path.to_string(),
        content: Some(content.as_bytes().to_vec()),
    }
}

/// Builds one jar under a temporary backup root
pub struct JarBuilder {
    backup_root: TempDir,
    name: String,
    cipher: Option<Cipher>,
    uid: u32,
    gid: u32,
    previous: Option<Index>,
}

impl JarBuilder {
    pub fn new(name: &str) -> Self {
        let backup_root = TempDir::new().unwrap();
        let (uid, gid) = owner_of(backup_root.path());
        Self {
            backup_root,
            name: name.to_string(),
            cipher: None,
            uid,
            gid,
            previous: None,
        }
    }

    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn backup_root(&self) -> &Path {
        self.backup_root.path()
    }

    pub fn jar_root(&self) -> PathBuf {
        self.backup_root.path().join(&self.name)
    }

    /// Write a snapshot holding every blob of `entries`.
    pub fn snapshot(&mut self, snapshot: &str, entries: &[FixtureEntry]) -> PathBuf {
        self.previous = None;
        self.write_version(&Version::snapshot(ts(snapshot)), entries)
    }

    /// Write a diff of `snapshot`. Files unchanged since the previously
    /// written version keep that version's provenance and store nothing.
    pub fn diff(&mut self, snapshot: &str, diff: &str, entries: &[FixtureEntry]) -> PathBuf {
        self.write_version(&Version::diff(ts(snapshot), ts(diff)), entries)
    }

    pub fn write_version(&mut self, version: &Version, entries: &[FixtureEntry]) -> PathBuf {
        let version_dir = version.directory(&self.jar_root());
        fs::create_dir_all(&version_dir).unwrap();

        let mut store = BlobStore::new(&version_dir);
        if let Some(cipher) = &self.cipher {
            store = store.with_cipher(cipher.clone());
        }

        let mut index = Index::new();
        for entry in entries {
            let index_entry = match &entry.content {
                None => IndexEntry::directory(DIR_MODE, self.uid, self.gid, version.timestamp().clone()),
                Some(content) => {
                    let checksum = compute_content_hash(content);
                    let carried = self
                        .previous
                        .as_ref()
                        .and_then(|previous| previous.get(&entry.path))
                        .filter(|previous| previous.checksum.as_ref() == Some(&checksum))
                        .map(|previous| previous.source_timestamp.clone());
                    let source = match carried {
                        Some(source) => source,
                        None => {
                            store.put(content).unwrap();
                            version.timestamp().clone()
                        }
                    };
                    IndexEntry::file(FILE_MODE, self.uid, self.gid, checksum, source)
                }
            };
            index.insert(entry.path.clone(), index_entry).unwrap();
        }

        index.save(&version_dir).unwrap();
        self.previous = Some(index);
        version_dir
    }
}

#[cfg(unix)]
fn owner_of(path: &Path) -> (u32, u32) {
    use std::os::unix::fs::MetadataExt;
    let metadata = fs::metadata(path).unwrap();
    (metadata.uid(), metadata.gid())
}

#[cfg(not(unix))]
fn owner_of(_path: &Path) -> (u32, u32) {
    (0, 0)
}

/// Relative path -> content (`None` for directories) of everything under
/// `root`
pub fn read_tree(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    let mut tree = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        let content = if entry.file_type().is_dir() {
            None
        } else {
            Some(fs::read(entry.path()).unwrap())
        };
        tree.insert(relative, content);
    }
    tree
}

pub fn expected_tree(entries: &[FixtureEntry]) -> BTreeMap<String, Option<Vec<u8>>> {
    entries
        .iter()
        .map(|entry| (entry.path.clone(), entry.content.clone()))
        .collect()
}
