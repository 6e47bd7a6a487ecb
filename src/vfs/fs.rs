//! FileSystem facade
//!
//! The single entry point for consumers: resolve a name plus open-time
//! parameters to a backend connection and wrap it in a [`PagedFile`].

use crate::backend::KvBackend;
use crate::config::Config;
use crate::error::Result;

use super::file::PagedFile;
use super::param::{ParamResolver, UriParams};

/// A paged file system bound to one backend for its whole lifetime
pub struct FileSystem<B: KvBackend> {
    backend: B,
    strict_alignment: bool,
}

impl<B: KvBackend> FileSystem<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            strict_alignment: false,
        }
    }

    /// Take paged-file options from `config`
    pub fn with_config(backend: B, config: &Config) -> Self {
        Self {
            backend,
            strict_alignment: config.strict_alignment,
        }
    }

    /// Open `name`; no partial handle is ever returned on failure
    pub fn open(&self, name: &str, params: &dyn ParamResolver) -> Result<PagedFile<B::Conn>> {
        let conn = self.backend.open(name, params)?;
        PagedFile::open(name, conn, self.strict_alignment)
    }

    /// Open from a `name?k=v&...` string
    pub fn open_uri(&self, uri: &str) -> Result<PagedFile<B::Conn>> {
        let (name, params) = UriParams::split_uri(uri);
        self.open(name, &params)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
