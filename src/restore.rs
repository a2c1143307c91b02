//! Restore engine
//!
//! Rebuilds a destination tree from one version's index. Entries are visited
//! in ascending lexical path order, so every directory is created before any
//! path beneath it. File content is located through the version chain and
//! fetched from the blob store of the directory that holds it.
//!
//! Failures are split in two:
//! - storage failures (index, blob store, destination I/O) abort the restore
//!   and surface as `Err(StorageError)`;
//! - an unresolvable provenance timestamp or a failed mode/owner change only
//!   affects its own entry and is recorded in the returned `RestoreReport`.

use crate::cas::{BlobStore, Checksum};
use crate::chain::ChainResolver;
use crate::crypto::Cipher;
use crate::error::{PermissionError, ResolveError, StorageError};
use crate::index::{Index, IndexEntry};
use crate::version::{Version, VersionLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Permission bits carried over from an index mode (file type bits dropped)
const PERMISSION_BITS: u32 = 0o7777;

#[cfg(unix)]
const OWNER_WRITE: u32 = 0o200;

/// What to do when a file entry's destination already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingFilePolicy {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Leave the existing file untouched
    Skip,
}

/// Applies an entry's mode and ownership to a restored path
pub trait PermissionApplier {
    fn apply(&self, path: &Path, entry: &IndexEntry) -> Result<(), PermissionError>;
}

/// chmod/chown based permission application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnixPermissions {
    pub mode: bool,
    pub ownership: bool,
}

impl Default for UnixPermissions {
    fn default() -> Self {
        Self {
            mode: true,
            ownership: true,
        }
    }
}

impl PermissionApplier for UnixPermissions {
    #[cfg(unix)]
    fn apply(&self, path: &Path, entry: &IndexEntry) -> Result<(), PermissionError> {
        use std::os::unix::fs::{chown, PermissionsExt};

        if self.mode {
            let mode = entry.mode & PERMISSION_BITS;
            fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
                PermissionError::Mode {
                    path: path.to_path_buf(),
                    mode,
                    source,
                }
            })?;
        }

        if self.ownership {
            chown(path, Some(entry.uid), Some(entry.gid)).map_err(|source| PermissionError::Owner {
                path: path.to_path_buf(),
                uid: entry.uid,
                gid: entry.gid,
                source,
            })?;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn apply(&self, _path: &Path, _entry: &IndexEntry) -> Result<(), PermissionError> {
        Ok(())
    }
}

/// Kind of an isolated, per-entry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryFailureKind {
    InvalidTimestampReference,
    PermissionApply,
}

impl fmt::Display for EntryFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryFailureKind::InvalidTimestampReference => "invalid timestamp reference",
            EntryFailureKind::PermissionApply => "permission apply",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFailure {
    pub path: String,
    pub kind: EntryFailureKind,
    pub message: String,
}

/// Outcome of a restore that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Index entries visited
    pub processed: usize,
    /// Directory entries created
    pub directories: usize,
    /// File entries written
    pub files: usize,
    /// File entries left alone under `ExistingFilePolicy::Skip`
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
}

impl RestoreReport {
    /// True when no entry failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_of(&self, kind: EntryFailureKind) -> impl Iterator<Item = &EntryFailure> {
        self.failures.iter().filter(move |failure| failure.kind == kind)
    }

    fn record(&mut self, path: &str, kind: EntryFailureKind, message: String) {
        warn!(path = %path, kind = %kind, error = %message, "Entry restore failed");
        self.failures.push(EntryFailure {
            path: path.to_string(),
            kind,
            message,
        });
    }
}

/// Restores index versions into destination trees
#[derive(Debug, Clone)]
pub struct RestoreEngine<P = UnixPermissions> {
    permissions: P,
    existing_files: ExistingFilePolicy,
    cipher: Option<Cipher>,
}

impl RestoreEngine<UnixPermissions> {
    pub fn new() -> Self {
        Self::with_permissions(UnixPermissions::default())
    }
}

impl Default for RestoreEngine<UnixPermissions> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PermissionApplier> RestoreEngine<P> {
    pub fn with_permissions(permissions: P) -> Self {
        Self {
            permissions,
            existing_files: ExistingFilePolicy::default(),
            cipher: None,
        }
    }

    pub fn existing_files(mut self, policy: ExistingFilePolicy) -> Self {
        self.existing_files = policy;
        self
    }

    /// Decrypt blobs with `cipher` while reading them
    pub fn cipher(mut self, cipher: Cipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Restore the version whose index lives at `index_location` (a version
    /// directory or its `index.json`) into `destination`.
    pub fn restore_from(
        &self,
        destination: &Path,
        index_location: &Path,
    ) -> Result<RestoreReport, StorageError> {
        let location = VersionLocation::parse(index_location)?;
        let index = Index::load(&location.directory())?;
        self.restore(&index, &location.jar_root, &location.version, destination)
    }

    /// Restore `index`, the index of `target` in the jar at `jar_root`, into
    /// `destination`.
    pub fn restore(
        &self,
        index: &Index,
        jar_root: &Path,
        target: &Version,
        destination: &Path,
    ) -> Result<RestoreReport, StorageError> {
        info!(
            version = %target,
            jar = %jar_root.display(),
            destination = %destination.display(),
            entries = index.len(),
            "Starting restore"
        );

        let resolver = ChainResolver::new(jar_root, target.clone());
        let mut report = RestoreReport::default();
        let mut created_dirs: Vec<(&str, &IndexEntry, PathBuf)> = Vec::new();

        for (path, entry) in index.iter() {
            report.processed += 1;
            let restore_path = destination.join(path);

            match &entry.checksum {
                None => {
                    fs::create_dir_all(&restore_path)
                        .map_err(|e| StorageError::io("create directory", &restore_path, e))?;
                    // A previous restore may have left it read-only; the
                    // recorded mode is applied again at the end
                    make_owner_writable(&restore_path);
                    report.directories += 1;
                    created_dirs.push((path, entry, restore_path));
                }
                Some(checksum) => {
                    self.restore_file(&resolver, path, entry, checksum, &restore_path, &mut report)?;
                }
            }
        }

        // Deepest first, so a read-only mode never blocks writing into a
        // directory's children.
        for (path, entry, restore_path) in created_dirs.iter().rev() {
            self.apply_permissions(path, restore_path, entry, &mut report);
        }

        info!(
            processed = report.processed,
            files = report.files,
            directories = report.directories,
            skipped = report.skipped,
            failures = report.failures.len(),
            "Restore finished"
        );
        Ok(report)
    }

    fn restore_file(
        &self,
        resolver: &ChainResolver,
        path: &str,
        entry: &IndexEntry,
        checksum: &Checksum,
        restore_path: &Path,
        report: &mut RestoreReport,
    ) -> Result<(), StorageError> {
        if let Some(parent) = restore_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io("create directory", parent, e))?;
        }

        if self.existing_files == ExistingFilePolicy::Skip && restore_path.exists() {
            debug!(path = %path, "Destination exists, skipping");
            report.skipped += 1;
            return Ok(());
        }

        let location = match resolver.locate(&entry.source_timestamp, checksum) {
            Ok(location) => location,
            Err(err @ ResolveError::InvalidTimestampReference { .. }) => {
                report.record(path, EntryFailureKind::InvalidTimestampReference, err.to_string());
                return Ok(());
            }
            Err(ResolveError::Storage(err)) => return Err(err),
        };

        let mut store = BlobStore::new(&location.directory);
        if let Some(cipher) = &self.cipher {
            store = store.with_cipher(cipher.clone());
        }
        let content = store.get(&location.checksum)?;

        if let Some(parent) = restore_path.parent() {
            make_owner_writable(parent);
        }
        make_owner_writable(restore_path);

        let mut file =
            File::create(restore_path).map_err(|e| StorageError::io("create file", restore_path, e))?;
        file.write_all(&content)
            .map_err(|e| StorageError::io("write file", restore_path, e))?;
        drop(file);

        debug!(path = %path, bytes = content.len(), tier = %location.tier, "Restored file");
        report.files += 1;
        self.apply_permissions(path, restore_path, entry, report);
        Ok(())
    }

    fn apply_permissions(
        &self,
        path: &str,
        restore_path: &Path,
        entry: &IndexEntry,
        report: &mut RestoreReport,
    ) {
        if let Err(err) = self.permissions.apply(restore_path, entry) {
            report.record(path, EntryFailureKind::PermissionApply, err.to_string());
        }
    }
}

/// Add the owner write bit to an existing path that lacks it. Failure is
/// only logged: the write that follows reports the real error.
#[cfg(unix)]
fn make_owner_writable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.file_type().is_symlink() {
        return;
    }
    let mode = metadata.permissions().mode() & PERMISSION_BITS;
    if mode & OWNER_WRITE != 0 {
        return;
    }
    match fs::set_permissions(path, fs::Permissions::from_mode(mode | OWNER_WRITE)) {
        Ok(()) => debug!(path = %path.display(), mode = %format!("{:o}", mode), "Made path writable for restore"),
        Err(e) => debug!(path = %path.display(), error = %e, "Could not make path writable"),
    }
}

#[cfg(not(unix))]
fn make_owner_writable(_path: &Path) {}
