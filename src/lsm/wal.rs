//! Write-Ahead Log
//!
//! Every put is appended here before it reaches the memtable. The log only
//! holds entries that have not yet been flushed to an SSTable; it is
//! truncated after every flush.
//!
//! ## File Format
//! ```text
//! ┌─────────┬─────────┬──────────────────────────┐
//! │ Len (4) │ CRC (4) │ bincode(WalRecord) (Len) │  ... repeated
//! └─────────┴─────────┴──────────────────────────┘
//! ```
//! Both header fields are little-endian. The CRC covers the payload only.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::WalSyncStrategy;
use crate::error::{Result, VfsError};

/// Length (4) + CRC (4)
pub const RECORD_HEADER_SIZE: usize = 8;

/// A single logged put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Log Sequence Number, monotonically increasing within one log
    pub lsn: u64,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl WalRecord {
    /// Frame the record as `[len][crc][payload]`
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        let crc = crc32fast::hash(&payload);

        let mut frame = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc.to_le_bytes());
        frame.extend_from_slice(&payload);
        Ok(frame)
    }
}

/// Outcome of replaying a log file
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records that passed the checksum
    pub records: u64,

    /// Trailing bytes discarded (torn write or corruption)
    pub discarded_bytes: u64,

    /// Highest LSN seen, 0 when the log was empty
    pub last_lsn: u64,
}

/// Read every intact record from the front of the log.
///
/// Replay stops at the first incomplete or mismatching frame; everything
/// after it is counted as discarded. A missing file replays as empty.
pub fn replay(path: &Path) -> Result<(Vec<WalRecord>, ReplayStats)> {
    let mut bytes = Vec::new();
    match File::open(path) {
        Ok(mut file) => {
            file.read_to_end(&mut bytes)?;
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), ReplayStats::default()));
        }
        Err(e) => return Err(e.into()),
    }

    let mut records = Vec::new();
    let mut stats = ReplayStats::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        match decode_frame(&bytes[pos..]) {
            Some((record, consumed)) => {
                stats.last_lsn = record.lsn;
                stats.records += 1;
                records.push(record);
                pos += consumed;
            }
            None => break,
        }
    }

    stats.discarded_bytes = (bytes.len() - pos) as u64;
    if stats.discarded_bytes > 0 {
        tracing::warn!(
            "WAL {}: discarded {} trailing bytes after {} valid records",
            path.display(),
            stats.discarded_bytes,
            stats.records
        );
    }

    Ok((records, stats))
}

/// Decode one frame, returning the record and the bytes consumed
fn decode_frame(bytes: &[u8]) -> Option<(WalRecord, usize)> {
    if bytes.len() < RECORD_HEADER_SIZE {
        return None;
    }
    let len = u32::from_le_bytes(bytes[0..4].try_into().ok()?) as usize;
    let crc = u32::from_le_bytes(bytes[4..8].try_into().ok()?);

    let end = RECORD_HEADER_SIZE.checked_add(len)?;
    let payload = bytes.get(RECORD_HEADER_SIZE..end)?;
    if crc32fast::hash(payload) != crc {
        return None;
    }

    let record = bincode::deserialize(payload).ok()?;
    Some((record, end))
}

/// Appends records to the log file
pub struct WalWriter {
    writer: BufWriter<File>,
    next_lsn: u64,
    sync_strategy: WalSyncStrategy,
    unsynced: usize,
}

impl WalWriter {
    /// Create (or truncate) the log at `path`
    pub fn create(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            next_lsn: 1,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a put and return its LSN
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<u64> {
        let lsn = self.next_lsn;
        let frame = WalRecord {
            lsn,
            key: key.to_vec(),
            value: value.to_vec(),
        }
        .encode()?;

        self.writer
            .write_all(&frame)
            .map_err(|e| VfsError::Storage(format!("WAL append failed: {}", e)))?;
        self.next_lsn += 1;
        self.unsynced += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync()?,
            WalSyncStrategy::EveryNEntries { .. } => self.writer.flush()?,
        }

        Ok(lsn)
    }

    /// Flush buffered bytes and fsync
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every record; called once the memtable is durable in an SSTable
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN that the next append will receive
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_replay_returns_appended_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wal.log");

        let mut writer = WalWriter::create(&path, WalSyncStrategy::EveryWrite).unwrap();
        assert_eq!(writer.append(b"a", b"1").unwrap(), 1);
        assert_eq!(writer.append(b"b", b"2").unwrap(), 2);
        assert_eq!(writer.next_lsn(), 3);

        let (records, stats) = replay(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].key, b"b");
        assert_eq!(stats.last_lsn, 2);
        assert_eq!(stats.discarded_bytes, 0);
    }

    #[test]
    fn test_replay_stops_at_torn_tail() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wal.log");

        let mut writer = WalWriter::create(&path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(b"kept", b"value").unwrap();
        writer.append(b"torn", b"value").unwrap();
        drop(writer);

        let len = std::fs::metadata(&path).unwrap().len();
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(len - 3).unwrap();

        let (records, stats) = replay(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, b"kept");
        assert!(stats.discarded_bytes > 0);
    }

    #[test]
    fn test_replay_rejects_flipped_payload_byte() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wal.log");

        let mut writer = WalWriter::create(&path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(b"key", b"value").unwrap();
        drop(writer);

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let (records, stats) = replay(&path).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.discarded_bytes, bytes.len() as u64);
    }

    #[test]
    fn test_truncate_empties_log() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wal.log");

        let mut writer =
            WalWriter::create(&path, WalSyncStrategy::EveryNEntries { count: 10 }).unwrap();
        writer.append(b"k", b"v").unwrap();
        writer.truncate().unwrap();

        let (records, _) = replay(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_replay_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let (records, stats) = replay(&temp.path().join("absent.log")).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats, ReplayStats::default());
    }
}
