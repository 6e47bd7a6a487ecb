//! Embedded LSM Store
//!
//! A small log-structured merge store: WAL for durability, a sorted
//! memtable for recent writes, and immutable SSTables on disk.
//!
//! ```text
//!   put ──► WAL (append) ──► MemTable ──(size limit)──► SSTable
//!   get ──► MemTable ──► SSTables newest → oldest
//! ```
//!
//! The store only supports `put` and `get`; the paged file layer never
//! deletes keys.
//!
//! ## Directory layout
//! ```text
//! {dir}/
//!   ├── wal.log
//!   └── sstables/table_NNNNNN.sst
//! ```

mod manager;
mod memtable;
mod sstable;
pub mod wal;

use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;

pub use manager::TableManager;
pub use memtable::MemTable;
pub use sstable::{SSTableBuilder, SSTableReader, TableInfo};

use wal::WalWriter;

/// Embedded ordered key-value store
///
/// ## Concurrency
/// Writes (put/flush/compaction) are serialized by `write_lock`. Reads go
/// through the memtable's RwLock and the table manager's lock.
pub struct Store {
    wal: Mutex<WalWriter>,
    memtable: MemTable,
    tables: TableManager,
    write_lock: Mutex<()>,
    memtable_size_limit: usize,
    compaction_threshold: usize,
}

impl Store {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create a store in `dir`
    ///
    /// On startup:
    /// 1. Create the directory tree
    /// 2. Load existing SSTables
    /// 3. Replay the WAL and flush what it held
    /// 4. Start a fresh WAL
    pub fn open(dir: &Path, config: &Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(dir)?;

        let tables = TableManager::open(&dir.join(Self::SSTABLE_DIR))?;
        let wal_path = dir.join(Self::WAL_FILENAME);

        let (records, stats) = wal::replay(&wal_path)?;
        if !records.is_empty() {
            let memtable = MemTable::new();
            for record in records {
                memtable.put(record.key, record.value);
            }
            tracing::info!(
                "Recovered {} WAL records (last_lsn={}) in {}",
                stats.records,
                stats.last_lsn,
                dir.display()
            );
            // Recovered data must be durable before the WAL is truncated below
            tables.flush(&memtable.snapshot())?;
        }

        let wal = WalWriter::create(&wal_path, config.wal_sync_strategy)?;

        Ok(Self {
            wal: Mutex::new(wal),
            memtable: MemTable::new(),
            tables,
            write_lock: Mutex::new(()),
            memtable_size_limit: config.memtable_size_limit,
            compaction_threshold: config.compaction_threshold,
        })
    }

    /// Memtable first, then SSTables newest → oldest
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.memtable.get(key) {
            return Ok(Some(value));
        }
        self.tables.get(key)
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(key, value)?;
        let size = self.memtable.put(key.to_vec(), value.to_vec());

        if size >= self.memtable_size_limit {
            self.flush_internal()?;
        }
        Ok(())
    }

    /// Force the memtable out to an SSTable
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Called with `write_lock` held
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.tables.flush(&self.memtable.snapshot())?;
        self.memtable.clear();
        self.wal.lock().truncate()?;

        // The flushed data is already durable; a failed merge is retried on
        // the next flush
        if self.tables.table_count() >= self.compaction_threshold {
            if let Err(e) = self.tables.compact() {
                tracing::warn!("Compaction of {} tables failed: {}", self.tables.table_count(), e);
            }
        }
        Ok(())
    }

    /// Flush pending data and sync the WAL
    pub fn close(&self) -> Result<()> {
        self.flush()?;
        self.wal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.tables.table_count()
    }
}
