//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Optional settings file looked up in the working directory (`.fsbulk.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Remove ----

pub struct RemoveConsts;

impl RemoveConsts {
    /// How many times a directory that is unexpectedly non-empty is retried.
    pub const NOT_EMPTY_RETRIES: u32 = 5;
    /// Backoff unit; attempt `n` waits `n` units.
    pub const NOT_EMPTY_BACKOFF: Duration = Duration::from_millis(20);
}

// ---- Reader ----

pub struct ReaderConsts;

impl ReaderConsts {
    /// Bytes inspected to decide between text and binary.
    pub const PEEK_LEN: usize = 100;
}

// ---- Progress ----

/// Progress bar is only drawn for trees at least this large (entries).
pub const PROGRESS_MIN_ENTRIES: usize = 1000;
