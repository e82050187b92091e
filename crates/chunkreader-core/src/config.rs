//! Production configuration constants.
//!
//! This module contains the limits and defaults used by the reader. The
//! constants seed [`ReaderConfig::default`], which is what
//! [`ReaderService`](crate::reader::ReaderService) actually consumes, so
//! callers can override any of them without touching global state.
//!
//! # Usage
//!
//! ```
//! use chunkreader_core::config::{ReaderConfig, DEFAULT_CHUNK_SIZE};
//!
//! let config = ReaderConfig::default();
//! assert_eq!(config.default_chunk_size, DEFAULT_CHUNK_SIZE);
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// Chunk Sizing
// =============================================================================

/// Largest message a delivery transport accepts, in characters.
///
/// Chunk sizes are capped at this value so a chunk that stops at the first
/// sentence end after the budget still has a chance to fit in one message.
pub const MESSAGE_LENGTH_LIMIT: usize = 4096;

/// Chunk size used for users that never picked one, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

// =============================================================================
// Texts
// =============================================================================

/// Maximum length of a text name in bytes.
pub const MAX_TEXT_NAME_BYTES: usize = 255;

/// Page size for text listings when the caller passes zero.
pub const DEFAULT_PAGE_SIZE: usize = 40;

/// Runtime configuration for [`ReaderService`](crate::reader::ReaderService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Chunk size for users without a stored preference.
    pub default_chunk_size: usize,
    /// Upper bound accepted by `set_chunk_size`.
    pub max_chunk_size: usize,
    /// Page size used when a listing asks for zero items.
    pub default_page_size: usize,
    pub max_text_name_bytes: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunk_size: MESSAGE_LENGTH_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_text_name_bytes: MAX_TEXT_NAME_BYTES,
        }
    }
}
