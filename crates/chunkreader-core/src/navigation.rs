//! Chunk navigation state machine.
//!
//! A user is either positioned on no text or on chunk `index` of the selected
//! text. Moves are described by a [`Transition`] and computed by
//! [`Transition::apply`], a pure function of the stored cursor and the chunk
//! count; stores run it inside the same transaction that persists the result.
//!
//! An unset cursor (a text that was never moved through) sits just before
//! chunk 0: [`Transition::Next`] and [`Transition::CurrentOrFirst`] both move
//! onto index 0, while [`Transition::Prev`] reports [`ReaderError::FirstChunk`].

use crate::error::{ReaderError, ValidationError};
use crate::types::TextRecord;
use serde::{Deserialize, Serialize};

/// A requested cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Next,
    Prev,
    /// Jump to a 0-based chunk index.
    SetPage(i64),
    /// Stay on the current chunk, or open the first one for an unset cursor.
    CurrentOrFirst,
}

impl Transition {
    /// Computes the chunk index this transition leads to.
    ///
    /// Failures leave the caller's state untouched; nothing is written.
    ///
    /// # Errors
    ///
    /// - [`ReaderError::TextFinished`] for `Next` on the last chunk, or on an
    ///   unset cursor of a text with no chunks
    /// - [`ReaderError::FirstChunk`] for `Prev` on the first chunk or an unset cursor
    /// - [`ValidationError::PageOutOfRange`] for `SetPage` outside `[0, chunk_count)`
    pub fn apply(&self, cursor: Option<u64>, chunk_count: u64) -> Result<u64, ReaderError> {
        let index = cursor.unwrap_or(0);
        match *self {
            Transition::Next => {
                let next = cursor.map_or(0, |c| c + 1);
                if next >= chunk_count {
                    return Err(ReaderError::TextFinished);
                }
                Ok(next)
            }
            Transition::Prev => {
                if index == 0 {
                    return Err(ReaderError::FirstChunk);
                }
                Ok(index - 1)
            }
            Transition::SetPage(page) => match u64::try_from(page) {
                Ok(page) if page < chunk_count => Ok(page),
                _ => Err(ValidationError::PageOutOfRange {
                    page,
                    total: chunk_count,
                }
                .into()),
            },
            Transition::CurrentOrFirst => Ok(index),
        }
    }

    /// Whether a successful transition from `cursor` changes the stored
    /// cursor.
    ///
    /// `CurrentOrFirst` only writes when it opens an unset cursor.
    pub fn persists(&self, cursor: Option<u64>) -> bool {
        !matches!(self, Transition::CurrentOrFirst) || cursor.is_none()
    }
}

/// Position of a chunk within its text, used to pick navigation affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    First,
    Last,
    Other,
}

impl ChunkType {
    /// Classifies `index` within a text of `chunk_count` chunks.
    ///
    /// The last chunk is always `Last`, so the only chunk of a single-chunk
    /// text offers no further moves.
    pub fn classify(index: u64, chunk_count: u64) -> Self {
        if index + 1 >= chunk_count {
            ChunkType::Last
        } else if index == 0 {
            ChunkType::First
        } else {
            ChunkType::Other
        }
    }
}

/// Result of a navigation: the text, the chunk the user is now on, and its
/// classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationOutcome {
    pub text: TextRecord,
    pub chunk_index: u64,
    pub chunk: String,
    pub chunk_type: ChunkType,
}

impl NavigationOutcome {
    pub fn new(text: TextRecord, chunk_index: u64, chunk: String) -> Self {
        let chunk_type = ChunkType::classify(chunk_index, text.chunk_count);
        Self {
            text,
            chunk_index,
            chunk,
            chunk_type,
        }
    }
}

/// Completion in percent: `round(cursor / (chunk_count - 1) * 100)`.
///
/// Returns 0 for an unset cursor and for texts with at most one chunk.
pub fn completion_percent(cursor: Option<u64>, chunk_count: u64) -> u8 {
    let Some(cursor) = cursor else {
        return 0;
    };
    if chunk_count <= 1 {
        return 0;
    }
    let last = chunk_count - 1;
    let percent = (cursor.min(last) as f64 / last as f64 * 100.0).round();
    percent as u8
}

/// Returns true when the cursor is on the last chunk.
pub fn is_finished(cursor: Option<u64>, chunk_count: u64) -> bool {
    cursor.is_some_and(|c| c + 1 >= chunk_count)
}
