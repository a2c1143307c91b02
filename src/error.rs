//! Error types for the jarvault backup and restore engine.
//!
//! Errors split into two families. `StorageError` is fatal: it aborts the
//! operation that raised it. `ResolveError::InvalidTimestampReference` and
//! `PermissionError` are scoped to a single index entry and are collected
//! into a `RestoreReport` instead of being raised.

use std::path::PathBuf;
use thiserror::Error;

/// Storage-related errors (index and blob store)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob {checksum} not found in {dir:?}")]
    BlobNotFound { dir: PathBuf, checksum: String },

    #[error("Malformed index at {path:?}: {reason}")]
    MalformedIndex { path: PathBuf, reason: String },

    #[error("Invalid jar layout: {0}")]
    InvalidLayout(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid checksum: {0}")]
    InvalidChecksum(String),

    #[error("Blob encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap an I/O error with the path and action that produced it.
    pub(crate) fn io(action: &str, path: &std::path::Path, err: std::io::Error) -> Self {
        StorageError::IoError(std::io::Error::new(
            err.kind(),
            format!("Failed to {} {:?}: {}", action, path, err),
        ))
    }
}

/// Failure to locate the version directory holding an entry's content
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Invalid timestamp in backup index: {timestamp} is not reachable from version {target}")]
    InvalidTimestampReference { timestamp: String, target: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure to apply mode or ownership to a restored path
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Failed to set mode {mode:o} on {path:?}: {source}")]
    Mode {
        path: PathBuf,
        mode: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set owner {uid}:{gid} on {path:?}: {source}")]
    Owner {
        path: PathBuf,
        uid: u32,
        gid: u32,
        #[source]
        source: std::io::Error,
    },
}

/// Encryption layer errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Top-level errors surfaced by the configuration and CLI layers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Encryption error: {0}")]
    CryptoError(#[from] CryptoError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
