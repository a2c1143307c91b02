//! Version identifiers and version directory scanning
//!
//! A version is named by a fixed-width `YYYYMMDDHHMM` timestamp, so lexical
//! order of names is chronological order. Scanning a directory for versions
//! only considers immediate child directories whose names have that shape.

use crate::error::StorageError;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

/// chrono format of a version name
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Width in characters of every version name
pub const TIMESTAMP_WIDTH: usize = 12;

/// Fixed-width, lexically sortable version identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    /// Parse a version name. Only the fixed-width digit shape is checked;
    /// calendar validity matters only to `to_datetime`.
    pub fn parse(s: &str) -> Result<Self, StorageError> {
        if !has_timestamp_shape(s) {
            return Err(StorageError::InvalidTimestamp(format!(
                "{:?} is not {} digits",
                s, TIMESTAMP_WIDTH
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// Timestamp for the current minute (UTC)
    pub fn now() -> Self {
        Self::from_datetime(Utc::now().naive_utc())
    }

    /// Truncate a datetime to minute precision
    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Calendar date and time of this version; fails for names like
    /// `202401019999` that have the right shape but are not a date.
    pub fn to_datetime(&self) -> Result<NaiveDateTime, StorageError> {
        NaiveDateTime::parse_from_str(&self.0, TIMESTAMP_FORMAT).map_err(|e| {
            StorageError::InvalidTimestamp(format!("{:?} is not a valid date: {}", self.0, e))
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Timestamp {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

/// True when `name` is exactly `TIMESTAMP_WIDTH` ASCII digits
pub fn has_timestamp_shape(name: &str) -> bool {
    name.len() == TIMESTAMP_WIDTH && name.bytes().all(|b| b.is_ascii_digit())
}

/// List the versions stored directly under `dir`, oldest first.
///
/// A missing `dir` has no versions. Children that are not directories, or
/// whose names lack the fixed-width digit shape, are ignored.
pub fn list_versions(dir: &Path) -> Result<Vec<Timestamp>, StorageError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io("list versions in", dir, e)),
    };

    let mut versions = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| StorageError::io("list versions in", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| StorageError::io("stat", &entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Ok(timestamp) = Timestamp::parse(name) {
            versions.push(timestamp);
        }
    }

    versions.sort();
    Ok(versions)
}

/// Most recent version under `dir`, if any
pub fn last(dir: &Path) -> Result<Option<Timestamp>, StorageError> {
    Ok(list_versions(dir)?.pop())
}

/// Latest version in `versions` lying within `[start, end]`
pub fn latest_in_window<'a>(
    versions: &'a [Timestamp],
    start: &Timestamp,
    end: &Timestamp,
) -> Option<&'a Timestamp> {
    versions
        .iter()
        .filter(|version| *version >= start && *version <= end)
        .max()
}
