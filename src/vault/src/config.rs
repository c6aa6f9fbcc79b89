//! Vault configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for the sled-backed credential store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database directory
    pub path: PathBuf,

    /// Page cache size in bytes (64MB default)
    pub cache_capacity: u64,

    /// Background flush interval; `None` disables the flusher
    pub flush_every_ms: Option<u64>,

    /// Delete the database when the store is dropped (tests)
    pub temporary: bool,

    /// Flush to disk after every committed credential mutation
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/gatehouse"),
            cache_capacity: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
            temporary: false,
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Argon2id cost parameters. Changing them only affects newly written hashes;
/// existing hashes carry their own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Minimal cost so test suites hashing many passwords stay fast.
    /// Never use outside tests.
    pub fn insecure_for_tests() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}
