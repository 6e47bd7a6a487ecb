//! Embedded LSM backend
//!
//! Each opened path is a [`Store`] directory. The store reports misses as
//! `Ok(None)`; the connection turns that into `VfsError::NotFound`.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{Result, VfsError};
use crate::lsm::Store;
use crate::vfs::param::ParamResolver;

use super::{KvBackend, KvConnection};

/// Backend opening one embedded LSM store per path
#[derive(Debug, Clone)]
pub struct LsmKv {
    config: Config,
}

impl LsmKv {
    /// Paths are resolved under `config.root_dir`
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn store_dir(&self, path: &str) -> PathBuf {
        self.config.root_dir.join(path)
    }
}

impl KvBackend for LsmKv {
    type Conn = LsmConn;

    fn open(&self, path: &str, _params: &dyn ParamResolver) -> Result<LsmConn> {
        let dir = self.store_dir(path);
        let store = Store::open(&dir, &self.config).map_err(|e| VfsError::open(path, e))?;
        tracing::debug!("LsmKv opened {}", dir.display());
        Ok(LsmConn { store: Some(store) })
    }
}

/// Connection owning an open store; `None` once closed
pub struct LsmConn {
    store: Option<Store>,
}

impl LsmConn {
    fn store(&self) -> Result<&Store> {
        self.store.as_ref().ok_or(VfsError::Closed)
    }
}

impl KvConnection for LsmConn {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.store()?.put(key, value)
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        self.store()?.get(key)?.ok_or(VfsError::NotFound)
    }

    fn close(&mut self) -> Result<()> {
        match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }
}

impl Drop for LsmConn {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("LSM store close on drop failed: {}", e);
        }
    }
}
