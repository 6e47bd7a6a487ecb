//! SSTable Module
//!
//! Immutable, sorted on-disk tables produced by memtable flushes and
//! compactions.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "PVST" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block                                              │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]   (per entry)  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block                                             │
//! │   [KeyLen: u32][Offset: u64][Key]          (per entry)  │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 | DataCRC: u32 | Padding (4)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. The data CRC is checked when a table
//! is opened.

mod builder;
mod reader;

pub use builder::SSTableBuilder;
pub use reader::SSTableReader;

pub(crate) const MAGIC: &[u8; 4] = b"PVST";
pub(crate) const VERSION: u16 = 1;

/// Magic (4) + Version (2) + EntryCount (8)
pub(crate) const HEADER_SIZE: u64 = 14;

/// IndexOffset (8) + DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Summary returned once a table has been written
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub entry_count: u64,
    pub file_size: u64,
}
