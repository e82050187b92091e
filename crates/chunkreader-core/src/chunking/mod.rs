//! Text segmentation: tokenizer and chunk splitter.
//!
//! Texts are split once, at ingestion, into chunks a reader consumes one at a
//! time. Splitting is a pure function of the text and the chunk size.
//!
//! # Pipeline
//!
//! 1. [`tokenize`] classifies the text into words, spaces, punctuation,
//!    sentence ends, quotes and links.
//! 2. [`SentenceChunker`] accumulates tokens and closes a chunk at the first
//!    eligible sentence end once the size budget is reached.
//!
//! # Heuristics
//!
//! Sentence detection is deliberately lightweight. Quotes are tracked with a
//! single toggling flag, so nested quotes using the same glyph, or an
//! apostrophe that closes a word (`dogs'`), can flip the quote state.

mod splitter;
mod tokenizer;
mod types;

use crate::error::ChunkingError;

pub use splitter::{split_text, SentenceChunker};
pub use tokenizer::{
    is_punctuation, is_quote, is_sentence_end, tokenize, Token, TokenKind, Tokenizer,
};
pub use types::TextChunk;

/// Trait for text chunking strategies.
///
/// The reader service holds one strategy and calls it for every text that
/// is not already in the processed-file cache.
pub trait ChunkingStrategy: Send + Sync {
    /// Splits text into chunks according to this strategy.
    ///
    /// # Arguments
    ///
    /// * `text` - The source text to chunk
    /// * `chunk_size` - Target chunk size in characters, at least 1
    ///
    /// # Returns
    ///
    /// Non-empty, trimmed chunks ordered by their position in the source text.
    /// Whitespace-only input yields an empty vector.
    fn chunk(&self, text: &str, chunk_size: usize) -> Result<Vec<TextChunk>, ChunkingError>;

    /// Returns a human-readable name for this strategy.
    fn name(&self) -> &'static str;
}

impl<T: ChunkingStrategy + ?Sized> ChunkingStrategy for std::sync::Arc<T> {
    fn chunk(&self, text: &str, chunk_size: usize) -> Result<Vec<TextChunk>, ChunkingError> {
        (**self).chunk(text, chunk_size)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_strategy_through_arc() {
        let strategy: Arc<dyn ChunkingStrategy> = Arc::new(SentenceChunker::new());
        let shared = Arc::clone(&strategy);
        let chunks = shared.chunk("One. Two.", 1).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(shared.name(), "sentence");
    }

    #[test]
    fn test_chunks_rejoin_to_source_tokens() {
        let text = "Alpha beta.  Gamma delta!\nEpsilon.";
        let chunks = SentenceChunker::new().chunk(text, 1).unwrap();
        let original: Vec<&str> = tokenize(text)
            .filter(|t| t.kind != TokenKind::Space)
            .map(|t| t.value)
            .collect();
        let from_chunks: Vec<&str> = chunks
            .iter()
            .flat_map(|chunk| tokenize(&chunk.text))
            .filter(|t| t.kind != TokenKind::Space)
            .map(|t| t.value)
            .collect();
        assert_eq!(from_chunks, original);
    }
}
