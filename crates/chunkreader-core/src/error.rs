//! Error types for chunkreader-core.
//!
//! This module defines the errors returned across the core library: chunking
//! configuration failures, input validation failures, and [`ReaderError`],
//! the typed result of every reader operation.

use crate::storage::StoreError;
use thiserror::Error;

/// Errors that can occur during text chunking.
#[derive(Debug, Clone, Error)]
pub enum ChunkingError {
    /// Invalid chunking configuration
    #[error("Invalid chunking config: {0}")]
    InvalidConfig(String),
}

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("text name is empty")]
    EmptyTextName,

    #[error("text name is {len} bytes long, at most {max} allowed")]
    TextNameTooLong { len: usize, max: usize },

    /// Content contains no printable characters.
    #[error("text is empty")]
    EmptyText,

    #[error("text is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("invalid chunk size {size}, should be between 1 and {max}")]
    InvalidChunkSize { size: usize, max: usize },

    /// `total` is the chunk count of the selected text.
    #[error("invalid page index {page}, should be between 0 and {}", .total.saturating_sub(1))]
    PageOutOfRange { page: i64, total: u64 },
}

/// Errors returned by reader operations.
///
/// [`ReaderError::FirstChunk`] and [`ReaderError::TextFinished`] are navigation
/// boundaries rather than failures; see [`ReaderError::is_boundary`].
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Attempt to move before the first chunk
    #[error("already at the first chunk")]
    FirstChunk,

    /// Attempt to move past the last chunk
    #[error("text is finished")]
    TextFinished,

    #[error("no text selected")]
    TextNotSelected,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("chunking error: {0}")]
    Chunking(#[from] ChunkingError),
}

impl ReaderError {
    /// Returns true for the expected navigation boundaries that callers render
    /// as regular states instead of failures.
    pub fn is_boundary(&self) -> bool {
        matches!(self, ReaderError::FirstChunk | ReaderError::TextFinished)
    }
}
