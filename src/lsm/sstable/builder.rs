//! SSTable Builder
//!
//! Streams sorted entries into a new table file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Result, VfsError};

use super::{TableInfo, HEADER_SIZE, MAGIC, VERSION};

/// Writes a new SSTable; entries must arrive in ascending key order
pub struct SSTableBuilder {
    writer: BufWriter<File>,
    entry_count: u64,
    /// Offset where the next entry will land
    offset: u64,
    index: Vec<(Vec<u8>, u64)>,
    last_key: Option<Vec<u8>>,
    hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    pub fn new(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?; // count, patched in finish()

        Ok(Self {
            writer,
            entry_count: 0,
            offset: HEADER_SIZE,
            index: Vec::new(),
            last_key: None,
            hasher: crc32fast::Hasher::new(),
        })
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(VfsError::Storage(
                    "SSTable keys must be added in strictly ascending order".to_string(),
                ));
            }
        }

        let key_len = (key.len() as u32).to_le_bytes();
        let val_len = (value.len() as u32).to_le_bytes();
        for part in [&key_len[..], &val_len[..], key, value] {
            self.writer.write_all(part)?;
            self.hasher.update(part);
        }

        self.index.push((key.to_vec(), self.offset));
        self.offset += 8 + key.len() as u64 + value.len() as u64;
        self.entry_count += 1;
        self.last_key = Some(key.to_vec());
        Ok(())
    }

    /// Write index and footer, patch the header count, fsync
    pub fn finish(mut self) -> Result<TableInfo> {
        let index_offset = self.offset;

        for (key, offset) in &self.index {
            self.writer.write_all(&(key.len() as u32).to_le_bytes())?;
            self.writer.write_all(&offset.to_le_bytes())?;
            self.writer.write_all(key)?;
        }

        let data_crc = self.hasher.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| VfsError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.seek(SeekFrom::Start(6))?;
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        Ok(TableInfo {
            entry_count: self.entry_count,
            file_size: file.metadata()?.len(),
        })
    }
}
