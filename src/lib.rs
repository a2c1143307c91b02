//! Jarvault: versioned, content-addressed directory backups
//!
//! A jar is one independently versioned backup target. Each jar holds full
//! snapshots, and each snapshot holds incremental diffs. A version directory
//! carries an index (`index.json`) and the blobs whose content changed at
//! that version; unchanged entries point back at the version that holds
//! their bytes. Restoring a version walks that chain to rebuild the tree.

pub mod cas;
pub mod chain;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod index;
pub mod jar;
pub mod logging;
pub mod restore;
pub mod timestamp;
pub mod version;

pub use cas::{compute_content_hash, BlobStore, Checksum};
pub use chain::{ChainResolver, ContentLocation, ResolutionTier};
pub use crypto::Cipher;
pub use error::{ApiError, CryptoError, PermissionError, ResolveError, StorageError};
pub use index::{Index, IndexEntry};
pub use jar::{list_jars, Jar};
pub use restore::{
    EntryFailure, EntryFailureKind, ExistingFilePolicy, PermissionApplier, RestoreEngine,
    RestoreReport, UnixPermissions,
};
pub use timestamp::Timestamp;
pub use version::{Version, VersionLocation};
