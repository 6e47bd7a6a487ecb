//! Configuration for pagevfs
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, VfsError};

/// Main configuration for a pagevfs deployment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Root directory under which the on-disk backends resolve file names.
    /// Internal structure:
    ///   {root_dir}/
    ///     └── {file name}/   (one directory per logical file)
    pub root_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Paged File Configuration
    // -------------------------------------------------------------------------
    /// Reject writes that are not whole, page-aligned pages
    pub strict_alignment: bool,

    // -------------------------------------------------------------------------
    // Embedded LSM Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    /// Number of SSTables that triggers a full compaction
    pub compaction_threshold: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./pagevfs_data"),
            strict_alignment: false,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 4 * 1024 * 1024, // 4 MB, ~1000 pages
            compaction_threshold: 8,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that would make the LSM store misbehave
    pub fn validate(&self) -> Result<()> {
        if self.memtable_size_limit == 0 {
            return Err(VfsError::Config(
                "memtable_size_limit must be greater than zero".to_string(),
            ));
        }
        if self.compaction_threshold < 2 {
            return Err(VfsError::Config(format!(
                "compaction_threshold must be at least 2, got {}",
                self.compaction_threshold
            )));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(VfsError::Config(
                "EveryNEntries count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory for on-disk backends
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_dir = path.into();
        self
    }

    /// Require page-aligned, whole-page writes
    pub fn strict_alignment(mut self, strict: bool) -> Self {
        self.config.strict_alignment = strict;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the SSTable count that triggers compaction
    pub fn compaction_threshold(mut self, count: usize) -> Self {
        self.config.compaction_threshold = count;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
