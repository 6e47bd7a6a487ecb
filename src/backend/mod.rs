//! Key-Value Backend Module
//!
//! The storage primitive under the paged file layer: opaque byte keys,
//! whole-value `put` and `get`, nothing else. No range scans, no deletes,
//! no multi-key transactions.
//!
//! ## Implementations
//! - [`FileKv`]: one file per key under a directory
//! - [`LsmKv`]: the embedded LSM store in [`crate::lsm`]
//! - [`CacheKv`]: a transaction-scoped cache supplied by an execution
//!   context, with keys namespaced by database name
//!
//! A backend is chosen once, when the [`crate::FileSystem`] is built.

pub mod cache;
pub mod file;
pub mod lsm;

use crate::error::Result;
use crate::vfs::param::ParamResolver;

pub use cache::{CacheConn, CacheKv, Context, ContextManager, MemoryCache, TxCache};
pub use file::{FileConn, FileKv};
pub use lsm::{LsmConn, LsmKv};

/// Factory for connections, one per opened file
pub trait KvBackend {
    type Conn: KvConnection;

    /// Establish a connection for `path`.
    ///
    /// `params` carries the open-time URI parameters. Any failure here is
    /// fatal to the open: no connection is returned.
    fn open(&self, path: &str, params: &dyn ParamResolver) -> Result<Self::Conn>;
}

/// A live connection, exclusively owned by one paged file
pub trait KvConnection {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetch a value. A missing key is always `Err(VfsError::NotFound)`,
    /// whatever the backend's own miss signal is.
    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>>;

    /// Release backend resources. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;
}

impl<C: KvConnection + ?Sized> KvConnection for Box<C> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn get(&mut self, key: &[u8]) -> Result<Vec<u8>> {
        (**self).get(key)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
