//! Sentence-respecting chunk splitter.
//!
//! Tokens are accumulated until the chunk holds at least `chunk_size`
//! characters; the chunk is then closed at the next sentence end that is not
//! inside a short quote. Links are atomic tokens, so a chunk never ends inside
//! one even when the link alone is longer than the budget.

use super::tokenizer::{tokenize, Token, TokenKind};
use super::types::TextChunk;
use super::ChunkingStrategy;
use crate::error::ChunkingError;

/// The default [`ChunkingStrategy`]: splits at sentence ends once the size
/// budget is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceChunker;

impl SentenceChunker {
    pub fn new() -> Self {
        Self
    }
}

impl ChunkingStrategy for SentenceChunker {
    fn chunk(&self, text: &str, chunk_size: usize) -> Result<Vec<TextChunk>, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(split_chunks(text, chunk_size))
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}

/// Splits `text` into chunks of roughly `chunk_size` characters.
///
/// A `chunk_size` of zero is treated as one. Whitespace-only input yields no
/// chunks.
///
/// # Example
///
/// ```
/// use chunkreader_core::chunking::split_text;
///
/// let chunks = split_text("First chunk.Second chunk.", 5);
/// assert_eq!(chunks, vec!["First chunk.", "Second chunk."]);
/// ```
pub fn split_text(text: &str, chunk_size: usize) -> Vec<String> {
    split_chunks(text, chunk_size.max(1))
        .into_iter()
        .map(|chunk| chunk.text)
        .collect()
}

fn split_chunks(text: &str, chunk_size: usize) -> Vec<TextChunk> {
    let tokens: Vec<Token<'_>> = tokenize(text).collect();
    let mut builder = ChunkBuilder::new(text);
    // characters seen since the open quote began, None outside quotes
    let mut quote_len: Option<usize> = None;

    for (i, token) in tokens.iter().enumerate() {
        let closes_flushed_sentence = token.kind == TokenKind::EndQuote
            && i > 0
            && tokens[i - 1].kind == TokenKind::EndSentence;
        if closes_flushed_sentence && builder.attach_to_last(token) {
            quote_len = None;
            continue;
        }

        let len = builder.push(token);

        match token.kind {
            TokenKind::BeginQuote => quote_len = Some(0),
            TokenKind::EndQuote => quote_len = None,
            _ => {
                if let Some(n) = quote_len.as_mut() {
                    *n += len;
                }
            }
        }

        if builder.chars < chunk_size {
            continue;
        }

        let boundary = match token.kind {
            TokenKind::EndSentence => {
                let next_ends_sentence = tokens
                    .get(i + 1)
                    .is_some_and(|next| next.kind == TokenKind::EndSentence);
                let short_quote_open = quote_len.is_some_and(|n| n < chunk_size);
                !next_ends_sentence && !short_quote_open
            }
            // sentence ended right before the closing quote
            TokenKind::EndQuote => {
                i > 0 && tokens[i - 1].kind == TokenKind::EndSentence
            }
            _ => false,
        };

        if boundary {
            builder.flush();
        }
    }

    builder.flush();
    builder.chunks
}

/// Tracks the pending chunk as a byte range of the source text.
struct ChunkBuilder<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    chars: usize,
    chunks: Vec<TextChunk>,
}

impl<'a> ChunkBuilder<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            start: 0,
            end: 0,
            chars: 0,
            chunks: Vec::new(),
        }
    }

    /// Extends the pending chunk by `token`, returning its length in characters.
    fn push(&mut self, token: &Token<'_>) -> usize {
        let len = token.char_len();
        self.end += token.value.len();
        self.chars += len;
        len
    }

    /// Appends `token` to the last emitted chunk when nothing is pending.
    fn attach_to_last(&mut self, token: &Token<'_>) -> bool {
        if self.start != self.end {
            return false;
        }
        let Some(last) = self.chunks.last_mut() else {
            return false;
        };
        self.end += token.value.len();
        self.start = self.end;
        last.end = self.end;
        last.text = self.text[last.start..last.end].to_string();
        true
    }

    fn flush(&mut self) {
        let pending = &self.text[self.start..self.end];
        let trimmed = pending.trim();
        if !trimmed.is_empty() {
            let start = self.start + (pending.len() - pending.trim_start().len());
            self.chunks.push(TextChunk {
                index: self.chunks.len(),
                text: trimmed.to_string(),
                start,
                end: start + trimmed.len(),
            });
        }
        self.start = self.end;
        self.chars = 0;
    }
}
