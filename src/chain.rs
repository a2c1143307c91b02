//! Version chain resolution
//!
//! An index entry names the version whose directory physically holds its
//! content (`source_timestamp`). Given the version being restored, the
//! resolver maps that timestamp back to a directory by checking, in order:
//!
//! 1. the target version itself,
//! 2. the target's base snapshot (when the target is a diff),
//! 3. the diffs of the base snapshot that are older than the target (later
//!    diffs are never consulted).
//!
//! The first match wins. A timestamp matching none of them means the index
//! references content outside its own chain.

use crate::cas::Checksum;
use crate::error::{ResolveError, StorageError};
use crate::timestamp::{self, Timestamp};
use crate::version::{diffs_directory, Version};
use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which link of the chain held the content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionTier {
    /// Content changed at the target version itself
    SelfVersion,
    /// Content unchanged since the base snapshot
    BaseSnapshot,
    /// Content last changed at an earlier diff of the same snapshot
    EarlierDiff,
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionTier::SelfVersion => "self",
            ResolutionTier::BaseSnapshot => "base-snapshot",
            ResolutionTier::EarlierDiff => "earlier-diff",
        };
        f.write_str(name)
    }
}

/// Where to fetch an entry's bytes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLocation {
    pub directory: PathBuf,
    pub checksum: Checksum,
    pub tier: ResolutionTier,
}

/// Resolves provenance timestamps for one restore target.
///
/// The snapshot's diff listing is read at most once per resolver, so all
/// lookups made through one resolver see the same chain.
#[derive(Debug)]
pub struct ChainResolver {
    jar_root: PathBuf,
    target: Version,
    diffs: OnceCell<Vec<Timestamp>>,
}

impl ChainResolver {
    pub fn new<P: Into<PathBuf>>(jar_root: P, target: Version) -> Self {
        Self {
            jar_root: jar_root.into(),
            target,
            diffs: OnceCell::new(),
        }
    }

    pub fn jar_root(&self) -> &Path {
        &self.jar_root
    }

    pub fn target(&self) -> &Version {
        &self.target
    }

    /// Directory holding content recorded with provenance `source`.
    pub fn resolve_directory(
        &self,
        source: &Timestamp,
    ) -> Result<(PathBuf, ResolutionTier), ResolveError> {
        if source == self.target.timestamp() {
            return Ok((self.target.directory(&self.jar_root), ResolutionTier::SelfVersion));
        }

        if self.target.is_diff() && source == self.target.snapshot_timestamp() {
            return Ok((
                self.target.snapshot_directory(&self.jar_root),
                ResolutionTier::BaseSnapshot,
            ));
        }

        let diffs = self.earlier_diffs()?;
        if diffs.binary_search(source).is_ok() {
            let directory =
                diffs_directory(&self.jar_root, self.target.snapshot_timestamp()).join(source.as_str());
            return Ok((directory, ResolutionTier::EarlierDiff));
        }

        Err(ResolveError::InvalidTimestampReference {
            timestamp: source.to_string(),
            target: self.target.to_string(),
        })
    }

    /// Locate the blob for an entry with provenance `source` and content
    /// hash `checksum`.
    pub fn locate(
        &self,
        source: &Timestamp,
        checksum: &Checksum,
    ) -> Result<ContentLocation, ResolveError> {
        let (directory, tier) = self.resolve_directory(source)?;
        debug!(
            source = %source,
            checksum = %checksum,
            tier = %tier,
            directory = %directory.display(),
            "Resolved content location"
        );
        Ok(ContentLocation {
            directory,
            checksum: checksum.clone(),
            tier,
        })
    }

    /// Diffs of the base snapshot strictly older than the target, ascending.
    ///
    /// Of all the snapshot's diffs, only those written before the target are
    /// candidates. A diff at or after the target did not exist when the
    /// target's index was written, so a provenance naming one is an invalid
    /// reference.
    fn earlier_diffs(&self) -> Result<&[Timestamp], StorageError> {
        if let Some(diffs) = self.diffs.get() {
            return Ok(diffs);
        }

        let dir = diffs_directory(&self.jar_root, self.target.snapshot_timestamp());
        let target_ts = self.target.timestamp();
        let diffs: Vec<Timestamp> = timestamp::list_versions(&dir)?
            .into_iter()
            .filter(|diff| diff < target_ts)
            .collect();

        debug!(dir = %dir.display(), count = diffs.len(), "Enumerated earlier diffs");
        Ok(self.diffs.get_or_init(|| diffs))
    }
}
