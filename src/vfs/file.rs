//! Paged File
//!
//! Byte-offset reads and writes over page-keyed storage.
//!
//! ## Key Layout
//! ```text
//! ┌──────────────┬────────────────────────────────────────────┐
//! │ 00 00 00 00  │ logical file size, decimal ASCII           │
//! │ 00 00 00 01  │ bytes [0, 4096)                            │
//! │ 00 00 00 02  │ bytes [4096, 8192)                         │
//! │ ...          │ page n holds [(n-1)*4096, n*4096)          │
//! └──────────────┴────────────────────────────────────────────┘
//! ```
//! Keys are 4-byte big-endian page numbers. Page 0 is never data.

use crate::backend::KvConnection;
use crate::error::{Result, VfsError};

/// Fixed page size in bytes
pub const PAGE_SIZE: usize = 4096;

/// Key holding the logical file size
pub const META_KEY: [u8; 4] = [0, 0, 0, 0];

/// How a read ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The whole buffer was filled
    Complete(usize),

    /// Data ran out after this many bytes; the rest of the buffer is zeroed
    EndOfData(usize),
}

impl ReadOutcome {
    pub fn bytes_read(&self) -> usize {
        match *self {
            ReadOutcome::Complete(n) | ReadOutcome::EndOfData(n) => n,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ReadOutcome::Complete(_))
    }
}

/// The file abstraction handed to the query engine binding
pub trait File {
    fn name(&self) -> &str;

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadOutcome>;

    /// Returns bytes written. A failure after some pages were stored comes
    /// back as `VfsError::ShortWrite` carrying the count.
    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize>;

    /// Logical size, served from memory
    fn size(&self) -> u64;

    fn close(&mut self) -> Result<()>;
}

/// 4-byte big-endian key for a page number
pub fn page_key(page_no: u32) -> [u8; 4] {
    page_no.to_be_bytes()
}

/// 1-based page covering byte `pos`
fn page_number(pos: u64) -> Result<u32> {
    u32::try_from(pos / PAGE_SIZE as u64 + 1)
        .map_err(|_| VfsError::Storage(format!("offset {} is beyond the last addressable page", pos)))
}

/// A file stored as pages in one backend connection
pub struct PagedFile<C: KvConnection> {
    name: String,
    conn: C,
    /// Cached high-water mark
    size: u64,
    strict_alignment: bool,
    closed: bool,
}

impl<C: KvConnection> PagedFile<C> {
    /// Wrap a fresh connection and load the stored size.
    ///
    /// A missing size key means an empty file. If loading fails the
    /// connection is closed before the error is returned.
    pub fn open(name: impl Into<String>, mut conn: C, strict_alignment: bool) -> Result<Self> {
        let name = name.into();
        let size = match Self::load_size(&mut conn) {
            Ok(size) => size,
            Err(e) => {
                if let Err(close_err) = conn.close() {
                    tracing::warn!("Closing {} after failed open: {}", name, close_err);
                }
                return Err(e);
            }
        };
        tracing::debug!("Opened {} (size {})", name, size);

        Ok(Self {
            name,
            conn,
            size,
            strict_alignment,
            closed: false,
        })
    }

    fn load_size(conn: &mut C) -> Result<u64> {
        let raw = match conn.get(&META_KEY) {
            Ok(raw) => raw,
            Err(VfsError::NotFound) => return Ok(0),
            Err(e) => return Err(e),
        };
        let text = String::from_utf8_lossy(&raw);
        text.trim()
            .parse::<u64>()
            .map_err(|_| VfsError::CorruptSize(text.into_owned()))
    }

    fn store_size(&mut self, size: u64) -> Result<()> {
        self.conn.put(&META_KEY, size.to_string().as_bytes())?;
        self.size = size;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        Ok(())
    }

    /// Zero the unread tail and report end of data
    fn end_of_data(buf: &mut [u8], nread: usize) -> ReadOutcome {
        buf[nread..].fill(0);
        tracing::trace!("short read: {} read, {} zeroed", nread, buf.len() - nread);
        ReadOutcome::EndOfData(nread)
    }

    /// Direct access to the underlying connection
    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }
}

impl<C: KvConnection> File for PagedFile<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadOutcome> {
        self.ensure_open()?;
        let total = buf.len();
        let mut nread = 0;

        while nread < total {
            let pos = offset + nread as u64;
            let page_no = page_number(pos)?;
            let in_page = (pos % PAGE_SIZE as u64) as usize;

            let page = match self.conn.get(&page_key(page_no)) {
                Ok(page) => page,
                Err(VfsError::NotFound) => return Ok(Self::end_of_data(buf, nread)),
                Err(e) => return Err(e),
            };
            if in_page >= page.len() {
                return Ok(Self::end_of_data(buf, nread));
            }

            let n = (page.len() - in_page).min(total - nread);
            buf[nread..nread + n].copy_from_slice(&page[in_page..in_page + n]);
            nread += n;

            // An undersized page is the last data there is
            if page.len() < PAGE_SIZE && nread < total {
                return Ok(Self::end_of_data(buf, nread));
            }
        }

        Ok(ReadOutcome::Complete(nread))
    }

    fn write_at(&mut self, buf: &[u8], offset: u64) -> Result<usize> {
        self.ensure_open()?;

        let page = PAGE_SIZE as u64;
        if offset % page != 0 || buf.len() % PAGE_SIZE != 0 {
            if self.strict_alignment {
                return Err(VfsError::UnalignedWrite {
                    offset,
                    len: buf.len(),
                });
            }
            tracing::warn!(
                "{}: unaligned write of {} bytes at {}; pages are stored from their start",
                self.name,
                buf.len(),
                offset
            );
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let first_page = page_number(offset)?;
        let mut written = 0usize;
        let mut failure = None;

        for (i, chunk) in buf.chunks(PAGE_SIZE).enumerate() {
            let page_no = match first_page.checked_add(i as u32) {
                Some(page_no) => page_no,
                None => {
                    failure = Some(VfsError::Storage(
                        "write extends beyond the last addressable page".to_string(),
                    ));
                    break;
                }
            };
            match self.conn.put(&page_key(page_no), chunk) {
                Ok(()) => written += chunk.len(),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let high_water = offset + written as u64;
        let size_result = if written > 0 && high_water > self.size {
            self.store_size(high_water)
        } else {
            Ok(())
        };

        match failure {
            None => size_result.map(|()| written),
            Some(e) => {
                if let Err(size_err) = size_result {
                    tracing::warn!("{}: size update after failed write: {}", self.name, size_err);
                }
                if written == 0 {
                    Err(e)
                } else {
                    Err(VfsError::ShortWrite {
                        written,
                        source: Box::new(e),
                    })
                }
            }
        }
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        tracing::debug!("Closing {}", self.name);
        self.conn.close()
    }
}

impl<C: KvConnection> Drop for PagedFile<C> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Closing {} on drop failed: {}", self.name, e);
        }
    }
}
