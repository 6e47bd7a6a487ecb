//! # pagevfs
//!
//! A page-oriented virtual file layer for an embedded query engine whose
//! only durable primitive is a key-value store:
//! - Byte-range `read_at`/`write_at` translated to 4096-byte page gets/puts
//! - Logical file size persisted under a reserved metadata key
//! - Interchangeable backends: file-per-key, embedded LSM, context cache
//! - Handle registry and status-code adapter for a native binding
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Query engine binding (VfsAdapter)              │
//! │                 handles ──► FileRegistry                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  FileSystem ──► PagedFile                   │
//! │            (offset ⇄ page number, size tracking)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ KvConnection: put / get / close
//!          ┌────────────┼─────────────────┐
//!          ▼            ▼                 ▼
//!   ┌────────────┐ ┌──────────┐   ┌────────────────┐
//!   │   FileKv   │ │  LsmKv   │   │    CacheKv     │
//!   │ (hex files)│ │ (Store)  │   │ (ctx TxCache)  │
//!   └────────────┘ └──────────┘   └────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod backend;
pub mod lsm;
pub mod vfs;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VfsError, Result};
pub use config::Config;
pub use backend::{KvBackend, KvConnection};
pub use vfs::{File, FileSystem, PagedFile, ReadOutcome, PAGE_SIZE};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of pagevfs
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
