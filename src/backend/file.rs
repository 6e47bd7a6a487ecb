//! Local-file-per-key backend
//!
//! Each opened path is a directory; each key is a file in it named by the
//! key's lowercase hex encoding (`00000001` for page 1).

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::{Result, VfsError};
use crate::vfs::param::ParamResolver;

use super::{KvBackend, KvConnection};

/// Backend storing every key as its own file
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Paths passed to `open` are resolved under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl KvBackend for FileKv {
    type Conn = FileConn;

    fn open(&self, path: &str, _params: &dyn ParamResolver) -> Result<FileConn> {
        let dir = self.root.join(path);
        fs::create_dir_all(&dir).map_err(|e| VfsError::open(path, e))?;
        tracing::debug!("FileKv opened {}", dir.display());
        Ok(FileConn {
            dir,
            closed: false,
        })
    }
}

/// Connection to one key directory
#[derive(Debug)]
pub struct FileConn {
    dir: PathBuf,
    closed: bool,
}

impl FileConn {
    fn key_path(&self, key: &[u8]) -> PathBuf {
        self.dir.join(hex::encode(key))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(VfsError::Closed);
        }
        Ok(())
    }
}

impl KvConnection for FileConn {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_open()?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        self.ensure_open()?;
        match fs::read(self.key_path(key)) {
            Ok(value) => Ok(value),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(VfsError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
