//! Restoring every version of a snapshot + diff chain

use super::support::{dir, expected_tree, file, read_tree, ts, FixtureEntry, JarBuilder};
use jarvault::cas::{compute_content_hash, BlobStore};
use jarvault::chain::{ChainResolver, ResolutionTier};
use jarvault::index::Index;
use jarvault::restore::RestoreEngine;
use jarvault::version::Version;
use std::fs;
use tempfile::TempDir;

const SNAPSHOT: &str = "202401010000";
const DIFF_1: &str = "202401020000";
const DIFF_2: &str = "202401030000";
const DIFF_3: &str = "202401040000";

struct Chain {
    builder: JarBuilder,
    versions: Vec<(Version, Vec<FixtureEntry>)>,
}

/// Snapshot plus three diffs; each file changes at a different point
fn chain() -> Chain {
    let snapshot = vec![
        dir("docs"),
        file("docs/a.txt", "alpha"),
        file("b.txt", "bravo"),
        file("c.txt", "charlie"),
    ];
    let diff_1 = vec![
        dir("docs"),
        file("docs/a.txt", "alpha, second edition"),
        file("b.txt", "bravo"),
        file("c.txt", "charlie"),
        file("d.txt", "delta"),
    ];
    let diff_2 = vec![
        dir("docs"),
        file("docs/a.txt", "alpha, second edition"),
        file("b.txt", "bravo, third edition"),
        file("d.txt", "delta"),
    ];
    let diff_3 = vec![
        dir("docs"),
        file("docs/a.txt", "alpha, second edition"),
        file("b.txt", "bravo, third edition"),
        file("d.txt", "delta"),
        file("e.txt", ""),
    ];

    let mut builder = JarBuilder::new("home");
    builder.snapshot(SNAPSHOT, &snapshot);
    builder.diff(SNAPSHOT, DIFF_1, &diff_1);
    builder.diff(SNAPSHOT, DIFF_2, &diff_2);
    builder.diff(SNAPSHOT, DIFF_3, &diff_3);

    Chain {
        builder,
        versions: vec![
            (Version::snapshot(ts(SNAPSHOT)), snapshot),
            (Version::diff(ts(SNAPSHOT), ts(DIFF_1)), diff_1),
            (Version::diff(ts(SNAPSHOT), ts(DIFF_2)), diff_2),
            (Version::diff(ts(SNAPSHOT), ts(DIFF_3)), diff_3),
        ],
    }
}

#[test]
fn test_every_version_restores_byte_identical() {
    let chain = chain();
    let jar_root = chain.builder.jar_root();
    let engine = RestoreEngine::new();

    for (version, entries) in &chain.versions {
        let dest = TempDir::new().unwrap();
        let index = Index::load(&version.directory(&jar_root)).unwrap();

        let report = engine.restore(&index, &jar_root, version, dest.path()).unwrap();

        assert!(report.is_clean(), "{} failed: {:?}", version, report.failures);
        assert_eq!(report.processed, entries.len());
        assert_eq!(read_tree(dest.path()), expected_tree(entries), "{}", version);
    }
}

#[test]
fn test_diffs_store_only_changed_content() {
    let chain = chain();
    let jar_root = chain.builder.jar_root();
    let diff_3 = Version::diff(ts(SNAPSHOT), ts(DIFF_3));

    let own_blobs = BlobStore::new(diff_3.directory(&jar_root));
    assert!(own_blobs.exists(&compute_content_hash(b"")));
    assert!(!own_blobs.exists(&compute_content_hash(b"delta")));
    assert!(!own_blobs.exists(&compute_content_hash(b"alpha, second edition")));
}

#[test]
fn test_provenance_resolves_across_all_tiers() {
    let chain = chain();
    let jar_root = chain.builder.jar_root();
    let target = Version::diff(ts(SNAPSHOT), ts(DIFF_3));
    let index = Index::load(&target.directory(&jar_root)).unwrap();
    let resolver = ChainResolver::new(&jar_root, target);

    let tier_of = |path: &str| {
        let entry = index.get(path).unwrap();
        resolver
            .locate(&entry.source_timestamp, entry.checksum.as_ref().unwrap())
            .unwrap()
            .tier
    };

    assert_eq!(tier_of("e.txt"), ResolutionTier::SelfVersion);
    assert_eq!(tier_of("docs/a.txt"), ResolutionTier::EarlierDiff);
    assert_eq!(tier_of("b.txt"), ResolutionTier::EarlierDiff);
    assert_eq!(tier_of("d.txt"), ResolutionTier::EarlierDiff);

    let diff_1 = Version::diff(ts(SNAPSHOT), ts(DIFF_1));
    let index = Index::load(&diff_1.directory(&jar_root)).unwrap();
    let entry = index.get("b.txt").unwrap();
    let location = ChainResolver::new(&jar_root, diff_1)
        .locate(&entry.source_timestamp, entry.checksum.as_ref().unwrap())
        .unwrap();
    assert_eq!(location.tier, ResolutionTier::BaseSnapshot);
    assert_eq!(location.directory, jar_root.join(SNAPSHOT));
}

#[test]
fn test_restore_from_index_file() {
    let chain = chain();
    let (version, entries) = &chain.versions[2];
    let index_file = Index::manifest_path(&version.directory(&chain.builder.jar_root()));
    let dest = TempDir::new().unwrap();

    let report = RestoreEngine::new().restore_from(dest.path(), &index_file).unwrap();

    assert!(report.is_clean());
    assert_eq!(read_tree(dest.path()), expected_tree(entries));
}

#[test]
fn test_later_diffs_are_not_needed() {
    let chain = chain();
    let jar_root = chain.builder.jar_root();
    fs::remove_dir_all(jar_root.join(SNAPSHOT).join("diff").join(DIFF_3)).unwrap();

    let (version, entries) = &chain.versions[2];
    let dest = TempDir::new().unwrap();
    let report = RestoreEngine::new()
        .restore_from(dest.path(), &version.directory(&jar_root))
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(read_tree(dest.path()), expected_tree(entries));
}

#[test]
fn test_restore_twice_is_idempotent() {
    let chain = chain();
    let (version, entries) = &chain.versions[3];
    let version_dir = version.directory(&chain.builder.jar_root());
    let dest = TempDir::new().unwrap();
    let engine = RestoreEngine::new();

    engine.restore_from(dest.path(), &version_dir).unwrap();
    let report = engine.restore_from(dest.path(), &version_dir).unwrap();

    assert!(report.is_clean());
    assert_eq!(read_tree(dest.path()), expected_tree(entries));
}
