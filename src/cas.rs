//! Content-addressed blob storage
//!
//! Blobs are stored flat inside a single version directory and named by the
//! lowercase hex BLAKE3 hash of their (plaintext) content:
//! `{version_dir}/{checksum}`.
//!
//! A blob is written once and never rewritten. Storing the same content twice
//! is a no-op, and blobs only become visible under their final name through
//! an atomic rename.

use crate::crypto::Cipher;
use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Hex content hash naming a blob
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Checksum(String);

impl Checksum {
    /// Parse a hex checksum. Any non-empty run of hex digits is accepted so
    /// that manifests written with other hash widths still load. Case is kept
    /// as written, since it is also the blob's file name.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if s.is_empty() {
            return Err(StorageError::InvalidChecksum("empty checksum".to_string()));
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidChecksum(format!(
                "{:?} contains non-hex character {:?}",
                s, bad
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Checksum {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Checksum> for String {
    fn from(value: Checksum) -> Self {
        value.0
    }
}

/// Compute the checksum of blob content using BLAKE3
pub fn compute_content_hash(content: &[u8]) -> Checksum {
    Checksum(blake3::hash(content).to_hex().to_string())
}

/// Blob store rooted at one version directory
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
    cipher: Option<Cipher>,
}

impl BlobStore {
    /// Open the blob store of a version directory. Nothing is created until
    /// the first `put`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            cipher: None,
        }
    }

    /// Encrypt blobs at rest with `cipher`. Checksums stay computed over the
    /// plaintext.
    pub fn with_cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `content`, returning its checksum.
    ///
    /// If a blob with the same checksum already exists this is a no-op.
    /// Otherwise the blob is written to a temporary file and renamed into
    /// place.
    pub fn put(&self, content: &[u8]) -> Result<Checksum, StorageError> {
        let checksum = compute_content_hash(content);
        let blob_path = self.blob_path(&checksum);

        if blob_path.exists() {
            trace!(checksum = %checksum, dir = %self.dir.display(), "Blob already stored");
            return Ok(checksum);
        }

        fs::create_dir_all(&self.dir)
            .map_err(|e| StorageError::io("create blob directory", &self.dir, e))?;

        let stored = match &self.cipher {
            Some(cipher) => cipher.encrypt(content).unwrap_or_default(),
            None => content.to_vec(),
        };

        let temp_path = self
            .dir
            .join(format!(".{}.{}.tmp", checksum, std::process::id()));
        fs::write(&temp_path, &stored).map_err(|e| StorageError::io("write blob", &temp_path, e))?;

        fs::rename(&temp_path, &blob_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::io("rename blob into", &blob_path, e)
        })?;

        debug!(checksum = %checksum, bytes = content.len(), dir = %self.dir.display(), "Stored blob");
        Ok(checksum)
    }

    /// Read the content stored under `checksum`.
    pub fn get(&self, checksum: &Checksum) -> Result<Vec<u8>, StorageError> {
        let blob_path = self.blob_path(checksum);
        let stored = match fs::read(&blob_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::BlobNotFound {
                    dir: self.dir.clone(),
                    checksum: checksum.to_string(),
                })
            }
            Err(e) => return Err(StorageError::io("read blob", &blob_path, e)),
        };

        match &self.cipher {
            // Empty content is stored unencrypted
            Some(_) if stored.is_empty() => Ok(stored),
            Some(cipher) => Ok(cipher.decrypt(&stored)?),
            None => Ok(stored),
        }
    }

    pub fn exists(&self, checksum: &Checksum) -> bool {
        self.blob_path(checksum).is_file()
    }

    pub fn blob_path(&self, checksum: &Checksum) -> PathBuf {
        self.dir.join(checksum.as_str())
    }
}
