//! Query engine adapter
//!
//! The narrow surface a native binding calls into: open, read, write, size,
//! close, each answered with a status code instead of a `Result`. Native
//! code only ever holds a [`FileHandle`].

use crate::backend::KvBackend;
use crate::error::VfsError;

use super::file::{File, PagedFile, ReadOutcome};
use super::fs::FileSystem;
use super::registry::{FileHandle, FileRegistry};

/// Status returned across the binding boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoStatus {
    Ok,
    /// Fewer bytes than requested; the buffer tail was zeroed
    ShortRead,
    /// A read failed in the backend
    IoErrRead,
    /// A write or close failed in the backend
    IoErr,
    /// The handle is unknown or already closed
    Misuse,
}

/// Binds a [`FileSystem`] to a handle registry
pub struct VfsAdapter<B: KvBackend> {
    fs: FileSystem<B>,
    files: FileRegistry<PagedFile<B::Conn>>,
}

impl<B: KvBackend> VfsAdapter<B> {
    pub fn new(fs: FileSystem<B>) -> Self {
        Self {
            fs,
            files: FileRegistry::new(),
        }
    }

    /// Open `name?params`; failures are logged and yield `None`
    pub fn open(&mut self, uri: &str) -> Option<FileHandle> {
        match self.fs.open_uri(uri) {
            Ok(file) => {
                let handle = self.files.insert(file);
                tracing::debug!("open {} -> {}", uri, handle);
                Some(handle)
            }
            Err(e) => {
                tracing::error!("open {} error {}", uri, e);
                None
            }
        }
    }

    pub fn read(&mut self, handle: FileHandle, buf: &mut [u8], offset: i64) -> IoStatus {
        let Some(file) = self.files.get_mut(handle) else {
            return IoStatus::Misuse;
        };
        let Ok(offset) = u64::try_from(offset) else {
            return IoStatus::IoErrRead;
        };
        tracing::trace!("{} read {} at {}", file.name(), buf.len(), offset);

        match file.read_at(buf, offset) {
            Ok(ReadOutcome::Complete(_)) => IoStatus::Ok,
            Ok(ReadOutcome::EndOfData(n)) => {
                tracing::trace!("short read: {} remained: {}", n, buf.len() - n);
                IoStatus::ShortRead
            }
            Err(e) => {
                tracing::error!("{} read error: {}", file.name(), e);
                IoStatus::IoErrRead
            }
        }
    }

    pub fn write(&mut self, handle: FileHandle, buf: &[u8], offset: i64) -> IoStatus {
        let Some(file) = self.files.get_mut(handle) else {
            return IoStatus::Misuse;
        };
        let Ok(offset) = u64::try_from(offset) else {
            return IoStatus::IoErr;
        };
        tracing::trace!("{} write {} at {}", file.name(), buf.len(), offset);

        match file.write_at(buf, offset) {
            Ok(_) => IoStatus::Ok,
            Err(e) => {
                tracing::error!("{} write error: {}", file.name(), e);
                IoStatus::IoErr
            }
        }
    }

    /// Logical size, or `None` for an unknown handle
    pub fn size(&self, handle: FileHandle) -> Option<i64> {
        self.files
            .get(handle)
            .map(|file| i64::try_from(file.size()).unwrap_or(i64::MAX))
    }

    pub fn close(&mut self, handle: FileHandle) -> IoStatus {
        let Some(mut file) = self.files.remove(handle) else {
            return IoStatus::Misuse;
        };
        match file.close() {
            Ok(()) => IoStatus::Ok,
            Err(VfsError::Closed) => IoStatus::Ok,
            Err(e) => {
                tracing::error!("{} close error: {}", file.name(), e);
                IoStatus::IoErr
            }
        }
    }

    pub fn open_files(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FileKv;
    use crate::vfs::file::PAGE_SIZE;
    use tempfile::TempDir;

    fn adapter(temp: &TempDir) -> VfsAdapter<FileKv> {
        VfsAdapter::new(FileSystem::new(FileKv::new(temp.path())))
    }

    #[test]
    fn test_full_read_after_write() {
        let temp = TempDir::new().unwrap();
        let mut vfs = adapter(&temp);
        let handle = vfs.open("main.db").unwrap();

        assert_eq!(vfs.write(handle, &[0x11; PAGE_SIZE], 0), IoStatus::Ok);
        assert_eq!(vfs.size(handle), Some(PAGE_SIZE as i64));

        let mut buf = [0u8; 64];
        assert_eq!(vfs.read(handle, &mut buf, 0), IoStatus::Ok);
        assert!(buf.iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_short_read_zeroes_tail() {
        let temp = TempDir::new().unwrap();
        let mut vfs = adapter(&temp);
        let handle = vfs.open("main.db").unwrap();
        vfs.write(handle, &[0x22; PAGE_SIZE], 0);

        let mut buf = [0xFFu8; 200];
        let status = vfs.read(handle, &mut buf, PAGE_SIZE as i64 - 100);
        assert_eq!(status, IoStatus::ShortRead);
        assert!(buf[..100].iter().all(|&b| b == 0x22));
        assert!(buf[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_closed_handle_is_misuse() {
        let temp = TempDir::new().unwrap();
        let mut vfs = adapter(&temp);
        let handle = vfs.open("main.db").unwrap();

        assert_eq!(vfs.close(handle), IoStatus::Ok);
        assert_eq!(vfs.close(handle), IoStatus::Misuse);
        assert_eq!(vfs.size(handle), None);
        assert_eq!(vfs.open_files(), 0);
    }

    #[test]
    fn test_negative_offset_rejected() {
        let temp = TempDir::new().unwrap();
        let mut vfs = adapter(&temp);
        let handle = vfs.open("main.db").unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(vfs.read(handle, &mut buf, -1), IoStatus::IoErrRead);
        assert_eq!(vfs.write(handle, &buf, -1), IoStatus::IoErr);
    }

    #[test]
    fn test_failed_open_returns_none() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("blocked"), b"x").unwrap();

        let mut vfs = adapter(&temp);
        assert!(vfs.open("blocked").is_none());
    }
}
