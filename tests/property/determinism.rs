//! Property-based tests for determinism guarantees

use jarvault::cas::{compute_content_hash, BlobStore};
use jarvault::chain::ChainResolver;
use jarvault::index::{Index, IndexEntry};
use jarvault::timestamp::{self, Timestamp};
use jarvault::version::Version;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

/// Minutes since 2000-01-01 rendered as a version name
fn timestamp_at(minutes: u32) -> Timestamp {
    let base = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    Timestamp::from_datetime(base + chrono::Duration::minutes(i64::from(minutes)))
}

/// Test that listing versions always yields an ascending, duplicate-free list
#[test]
fn test_list_versions_sorted_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec(0u32..5_000_000, 0..20),
            |offsets| {
                let dir = TempDir::new().unwrap();
                let mut expected = BTreeSet::new();
                for offset in &offsets {
                    let ts = timestamp_at(*offset);
                    fs::create_dir_all(dir.path().join(ts.as_str())).unwrap();
                    expected.insert(ts);
                }

                let listed = timestamp::list_versions(dir.path()).unwrap();
                let expected: Vec<Timestamp> = expected.into_iter().collect();
                prop_assert_eq!(listed, expected);
                Ok(())
            },
        )
        .unwrap();
}

/// Test that lexical and chronological order agree for version names
#[test]
fn test_lexical_order_is_chronological_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0u32..50_000_000, 0u32..50_000_000), |(a, b)| {
            let (ta, tb) = (timestamp_at(a), timestamp_at(b));
            prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
            prop_assert_eq!(ta.as_str().cmp(tb.as_str()), a.cmp(&b));
            Ok(())
        })
        .unwrap();
}

/// Test that resolution depends only on the chain, never on lookup order
#[test]
fn test_resolver_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                prop::collection::btree_set(1u32..1_000, 1..8),
                prop::collection::vec(0u32..1_000, 1..16),
            ),
            |(diff_offsets, lookups)| {
                let jar = TempDir::new().unwrap();
                let snapshot = timestamp_at(0);
                let diffs: Vec<Timestamp> = diff_offsets.iter().map(|d| timestamp_at(*d)).collect();
                for diff in &diffs {
                    fs::create_dir_all(jar.path().join(snapshot.as_str()).join("diff").join(diff.as_str()))
                        .unwrap();
                }
                let target_ts = diffs[diffs.len() / 2].clone();
                let target = Version::diff(snapshot.clone(), target_ts.clone());

                let forward = ChainResolver::new(jar.path(), target.clone());
                let backward = ChainResolver::new(jar.path(), target);
                let sources: Vec<Timestamp> = lookups.iter().map(|l| timestamp_at(*l)).collect();

                let results: Vec<_> = sources
                    .iter()
                    .map(|s| forward.resolve_directory(s).ok())
                    .collect();
                let reversed: Vec<_> = sources
                    .iter()
                    .rev()
                    .map(|s| backward.resolve_directory(s).ok())
                    .collect();

                for (source, (first, second)) in sources.iter().zip(results.iter().zip(reversed.iter().rev())) {
                    prop_assert_eq!(first, second);
                    let reachable = *source == snapshot
                        || *source == target_ts
                        || (diffs.contains(source) && *source < target_ts);
                    prop_assert_eq!(first.is_some(), reachable);
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Test that storing the same content twice keeps one blob
#[test]
fn test_blob_dedup_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..10),
            |contents| {
                let dir = TempDir::new().unwrap();
                let store = BlobStore::new(dir.path());
                for content in contents.iter().chain(contents.iter()) {
                    let checksum = store.put(content).unwrap();
                    prop_assert_eq!(&checksum, &compute_content_hash(content));
                    prop_assert_eq!(&store.get(&checksum).unwrap(), content);
                }

                let unique: BTreeSet<&Vec<u8>> = contents.iter().collect();
                let stored = fs::read_dir(dir.path()).unwrap().count();
                prop_assert_eq!(stored, unique.len());
                Ok(())
            },
        )
        .unwrap();
}

/// Test that index iteration order ignores insertion order
#[test]
fn test_index_order_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &prop::collection::btree_set("[a-z]{1,3}(/[a-z]{1,3}){0,2}", 1..12),
            |paths| {
                let ts = timestamp_at(0);
                let mut forward = Index::new();
                let mut backward = Index::new();
                for path in &paths {
                    forward
                        .insert(path.clone(), IndexEntry::directory(0o755, 0, 0, ts.clone()))
                        .unwrap();
                }
                for path in paths.iter().rev() {
                    backward
                        .insert(path.clone(), IndexEntry::directory(0o755, 0, 0, ts.clone()))
                        .unwrap();
                }

                let order: Vec<&str> = forward.iter().map(|(p, _)| p).collect();
                let expected: Vec<&str> = paths.iter().map(String::as_str).collect();
                prop_assert_eq!(order, expected);
                prop_assert_eq!(forward, backward);
                Ok(())
            },
        )
        .unwrap();
}
