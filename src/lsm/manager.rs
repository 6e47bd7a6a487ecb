//! Table Manager
//!
//! Owns the set of open SSTables for one store directory.
//!
//! ## Responsibilities
//! - Discover existing tables on startup
//! - Search tables newest → oldest for reads
//! - Write new tables from memtable flushes
//! - Merge every table into one when the count reaches a threshold

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::Result;

use super::sstable::{SSTableBuilder, SSTableReader, TableInfo};

/// Manages the on-disk tables of one store
pub struct TableManager {
    dir: PathBuf,

    /// Open readers, ordered newest → oldest
    tables: RwLock<Vec<SSTableReader>>,

    next_table_id: AtomicU64,
}

impl TableManager {
    const PARTIAL_EXTENSION: &'static str = "sst.tmp";

    /// Open or create the table directory and load every table in it
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if Self::is_partial_table(&path) {
                tracing::warn!("Removing partial SSTable {}", path.display());
                fs::remove_file(&path)?;
            } else if let Some(id) = Self::parse_table_id(&path) {
                ids.push(id);
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));

        let tables = ids
            .iter()
            .map(|&id| SSTableReader::open(&Self::table_path(dir, id)))
            .collect::<Result<Vec<_>>>()?;

        let next_id = ids.first().map(|&id| id + 1).unwrap_or(1);
        tracing::debug!("Loaded {} SSTables from {}", tables.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            tables: RwLock::new(tables),
            next_table_id: AtomicU64::new(next_id),
        })
    }

    /// Search newest → oldest
    ///
    /// Takes the write lock: a reader seeks its file handle on every lookup.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut tables = self.tables.write();
        for table in tables.iter_mut() {
            if !table.might_contain(key) {
                continue;
            }
            if let Some(value) = table.get(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Write sorted entries into a new table and make it the newest
    pub fn flush(&self, entries: &[(Vec<u8>, Vec<u8>)]) -> Result<TableInfo> {
        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        let (path, info) = self.write_table(id, entries.iter().map(|(k, v)| (k, v)))?;
        let reader = SSTableReader::open(&path)?;

        self.tables.write().insert(0, reader);
        tracing::debug!(
            "Flushed {} entries to {} ({} bytes)",
            info.entry_count,
            path.display(),
            info.file_size
        );
        Ok(info)
    }

    /// Merge every table into one, newest value winning.
    ///
    /// The merged table gets a fresh, higher id before the old files are
    /// removed, so a crash in between leaves a readable (if redundant) set.
    pub fn compact(&self) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.len() < 2 {
            return Ok(());
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for table in tables.iter_mut().rev() {
            for (key, value) in table.entries()? {
                merged.insert(key, value);
            }
        }

        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst);
        let (path, _) = self.write_table(id, merged.iter())?;
        let reader = SSTableReader::open(&path)?;

        let old = std::mem::replace(&mut *tables, vec![reader]);
        for table in &old {
            fs::remove_file(table.path())?;
        }
        tracing::debug!(
            "Compacted {} SSTables into {} ({} entries)",
            old.len(),
            path.display(),
            merged.len()
        );
        Ok(())
    }

    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Build a table under a temporary name, then rename it into place.
    ///
    /// A crash mid-build leaves only a `.sst.tmp` file, removed by `open`.
    fn write_table<'a, I>(&self, id: u64, entries: I) -> Result<(PathBuf, TableInfo)>
    where
        I: Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)>,
    {
        let path = Self::table_path(&self.dir, id);
        let tmp_path = path.with_extension(Self::PARTIAL_EXTENSION);

        let built = SSTableBuilder::new(&tmp_path).and_then(|mut builder| {
            for (key, value) in entries {
                builder.add(key, value)?;
            }
            builder.finish()
        });
        let info = match built {
            Ok(info) => info,
            Err(e) => {
                if tmp_path.is_file() {
                    let _ = fs::remove_file(&tmp_path);
                }
                return Err(e);
            }
        };

        fs::rename(&tmp_path, &path)?;
        Self::sync_dir(&self.dir)?;
        Ok((path, info))
    }

    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> Result<()> {
        fs::File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> Result<()> {
        Ok(())
    }

    fn table_path(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("table_{:06}.sst", id))
    }

    /// "table_000042.sst.tmp"
    fn is_partial_table(path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(".sst.tmp"))
            .unwrap_or(false)
    }

    /// "table_000042.sst" → Some(42)
    fn parse_table_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let stem = path.file_stem()?.to_string_lossy();
        stem.strip_prefix("table_")?.parse().ok()
    }
}
