//! Types for text chunking.

use serde::{Deserialize, Serialize};

/// A chunk of text with its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Index of this chunk in the text (0-based)
    pub index: usize,
    /// Chunk content, trimmed of surrounding whitespace
    pub text: String,
    /// Byte offset where the trimmed chunk starts in the source text
    pub start: usize,
    /// Byte offset where the trimmed chunk ends in the source text
    pub end: usize,
}
