//! Virtual File Module
//!
//! Byte-addressable files on top of a [`crate::backend::KvBackend`].
//!
//! ## Data Flow
//! ```text
//! caller ──► FileSystem::open(name, params)
//!              └─► KvBackend::open(path, params) ──► connection
//!                                                     │
//!            PagedFile wraps the connection ◄─────────┘
//! caller ──► read_at / write_at / size / close
//!              └─► get / put on fixed 4096-byte pages
//! ```

pub mod adapter;
pub mod file;
pub mod fs;
pub mod param;
pub mod registry;

pub use adapter::{IoStatus, VfsAdapter};
pub use file::{page_key, File, PagedFile, ReadOutcome, META_KEY, PAGE_SIZE};
pub use fs::FileSystem;
pub use param::{NoParams, ParamResolver, ParamSlot, UriParams};
pub use registry::{FileHandle, FileRegistry};
