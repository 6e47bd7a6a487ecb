//! Error types for pagevfs
//!
//! Provides a unified error type for the paged file layer and every backend.

use thiserror::Error;

/// Result type alias using VfsError
pub type Result<T> = std::result::Result<T, VfsError>;

/// Unified error type for pagevfs operations
#[derive(Debug, Error)]
pub enum VfsError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    /// The one backend-neutral miss signal. Adapters translate their own
    /// not-found conditions into this variant.
    #[error("Key not found")]
    NotFound,

    #[error("Failed to open '{path}': {reason}")]
    Open { path: String, reason: String },

    #[error("Context {0} not found")]
    ContextNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Paged File Errors
    // -------------------------------------------------------------------------
    #[error("Stored file size is not a decimal integer: {0:?}")]
    CorruptSize(String),

    #[error("Write of {len} bytes at offset {offset} is not page aligned")]
    UnalignedWrite { offset: u64, len: usize },

    #[error("Write stopped after {written} bytes: {source}")]
    ShortWrite {
        written: usize,
        #[source]
        source: Box<VfsError>,
    },

    #[error("File handle is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VfsError {
    /// True when the error is the backend-neutral `NotFound` signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound)
    }

    /// Wrap any error raised while establishing a backend connection
    pub(crate) fn open(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        VfsError::Open {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<bincode::Error> for VfsError {
    fn from(err: bincode::Error) -> Self {
        VfsError::Serialization(err.to_string())
    }
}
