//! SSTable Reader
//!
//! Point lookups through an in-memory index loaded at open time.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, VfsError};

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

/// Open SSTable with its key → offset index in memory
pub struct SSTableReader {
    path: PathBuf,
    file: BufReader<File>,
    index: BTreeMap<Vec<u8>, u64>,
    index_offset: u64,
}

impl SSTableReader {
    /// Open a table, verifying header, footer and data checksum
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();
        let corrupt = |what: &str| {
            VfsError::Corruption(format!("SSTable {}: {}", path.display(), what))
        };

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt("file too short"));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        if &header[0..4] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(&format!("unsupported version {}", version)));
        }
        let entry_count = read_u64(&header[6..14]);

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let index_offset = read_u64(&footer[0..8]);
        let data_crc = read_u32(&footer[8..12]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt("index offset out of range"));
        }

        // Checksum the data block in bounded chunks
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = index_offset - HEADER_SIZE;
        let mut chunk = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            file.read_exact(&mut chunk[..n])?;
            hasher.update(&chunk[..n]);
            remaining -= n as u64;
        }
        if hasher.finalize() != data_crc {
            return Err(corrupt("data checksum mismatch"));
        }

        let index_len = (file_size - FOOTER_SIZE - index_offset) as usize;
        let mut index_data = vec![0u8; index_len];
        file.read_exact(&mut index_data)?;

        let mut index = BTreeMap::new();
        let mut pos = 0;
        while pos < index_data.len() {
            if pos + 12 > index_data.len() {
                return Err(corrupt("truncated index entry"));
            }
            let key_len = read_u32(&index_data[pos..]) as usize;
            let offset = read_u64(&index_data[pos + 4..]);
            pos += 12;
            let key = index_data
                .get(pos..pos + key_len)
                .ok_or_else(|| corrupt("truncated index key"))?;
            index.insert(key.to_vec(), offset);
            pos += key_len;
        }

        if index.len() as u64 != entry_count {
            return Err(corrupt(&format!(
                "header claims {} entries, index holds {}",
                entry_count,
                index.len()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            index_offset,
        })
    }

    /// Look up a key; `Ok(None)` when this table does not hold it
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(&offset) => offset,
            None => return Ok(None),
        };
        let (_, value) = self.read_entry_at(offset)?;
        Ok(Some(value))
    }

    /// Every entry in key order (used by compaction)
    pub fn entries(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let offsets: Vec<u64> = self.index.values().copied().collect();
        offsets
            .into_iter()
            .map(|offset| self.read_entry_at(offset))
            .collect()
    }

    fn read_entry_at(&mut self, offset: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        if offset >= self.index_offset {
            return Err(VfsError::Corruption(format!(
                "SSTable {}: entry offset {} points past data block",
                self.path.display(),
                offset
            )));
        }
        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;
        let key_len = read_u32(&header[0..4]) as usize;
        let val_len = read_u32(&header[4..8]) as usize;

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;
        let mut value = vec![0u8; val_len];
        self.file.read_exact(&mut value)?;
        Ok((key, value))
    }

    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    /// Range check against the smallest and largest key
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.index.keys().next(), self.index.keys().next_back()) {
            (Some(min), Some(max)) => key >= min.as_slice() && key <= max.as_slice(),
            _ => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::super::SSTableBuilder;
    use super::*;
    use tempfile::TempDir;

    fn build(path: &Path, count: usize) {
        let mut builder = SSTableBuilder::new(path).unwrap();
        for i in 0..count {
            let key = format!("key{:05}", i);
            builder.add(key.as_bytes(), format!("value{}", i).as_bytes()).unwrap();
        }
        let info = builder.finish().unwrap();
        assert_eq!(info.entry_count, count as u64);
    }

    #[test]
    fn test_lookup_hits_and_misses() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.sst");
        build(&path, 50);

        let mut reader = SSTableReader::open(&path).unwrap();
        assert_eq!(reader.entry_count(), 50);
        assert_eq!(reader.get(b"key00042").unwrap(), Some(b"value42".to_vec()));
        assert_eq!(reader.get(b"key99999").unwrap(), None);
        assert!(reader.might_contain(b"key00010"));
        assert!(!reader.might_contain(b"zzz"));
    }

    #[test]
    fn test_entries_in_key_order() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.sst");
        build(&path, 3);

        let mut reader = SSTableReader::open(&path).unwrap();
        let entries = reader.entries().unwrap();
        assert_eq!(entries[0], (b"key00000".to_vec(), b"value0".to_vec()));
        assert_eq!(entries[2], (b"key00002".to_vec(), b"value2".to_vec()));
    }

    #[test]
    fn test_empty_table_opens() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.sst");
        build(&path, 0);

        let mut reader = SSTableReader::open(&path).unwrap();
        assert_eq!(reader.get(b"anything").unwrap(), None);
        assert!(!reader.might_contain(b"anything"));
    }

    #[test]
    fn test_builder_rejects_unsorted_keys() {
        let temp = TempDir::new().unwrap();
        let mut builder = SSTableBuilder::new(&temp.path().join("t.sst")).unwrap();
        builder.add(b"b", b"1").unwrap();
        assert!(matches!(builder.add(b"a", b"2"), Err(VfsError::Storage(_))));
    }

    #[test]
    fn test_corrupt_data_block_detected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t.sst");
        build(&path, 5);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[HEADER_SIZE as usize + 10] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            SSTableReader::open(&path),
            Err(VfsError::Corruption(_))
        ));
    }
}
