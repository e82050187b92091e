//! Core records shared by the store, the navigator and the reader service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a reader, assigned by the calling transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(i64);

impl UserId {
    /// Creates a user ID from a raw i64 value.
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw i64 value of this ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a text.
///
/// File-derived texts share the id of their processed-file cache entry, so the
/// same id may appear in several users' collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextId(Uuid);

impl TextId {
    /// Generates a new random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TextId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Where a text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    /// Pasted text with a private chunk namespace.
    Text,
    /// Uploaded file whose namespace may be shared through the processed-file cache.
    File,
}

/// A text in a user's collection, including the user's reading cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub id: TextId,
    pub name: String,
    pub source: TextSource,
    /// Key of the chunk namespace holding this text's chunks.
    pub namespace: String,
    /// Number of chunks, at least 1.
    pub chunk_count: u64,
    /// Index of the chunk the user is positioned at; `None` until first moved.
    pub cursor: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TextRecord {
    /// Creates a record for a text nobody has opened yet.
    pub fn new(
        id: TextId,
        name: impl Into<String>,
        source: TextSource,
        namespace: impl Into<String>,
        chunk_count: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            source,
            namespace: namespace.into(),
            chunk_count,
            cursor: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Reading progress in percent.
    pub fn completion_percent(&self) -> u8 {
        crate::navigation::completion_percent(self.cursor, self.chunk_count)
    }

    /// Returns true once the cursor sits on the last chunk.
    pub fn is_finished(&self) -> bool {
        crate::navigation::is_finished(self.cursor, self.chunk_count)
    }

    /// Chunks left after the current one.
    pub fn remaining_chunks(&self) -> u64 {
        let position = self.cursor.map_or(0, |c| c + 1);
        self.chunk_count.saturating_sub(position)
    }
}

/// A user's ordered text collection and current selection.
///
/// This record is the unit of consistency: every structural change and every
/// cursor move reads and rewrites it inside one store transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTexts {
    #[serde(default = "UserTexts::current_version")]
    pub version: u32,
    pub texts: Vec<TextRecord>,
    /// Index into `texts` of the selected text.
    pub current: Option<usize>,
}

impl UserTexts {
    /// Current schema version for UserTexts
    pub const CURRENT_VERSION: u32 = 1;

    fn current_version() -> u32 {
        Self::CURRENT_VERSION
    }

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            texts: Vec::new(),
            current: None,
        }
    }
}

impl Default for UserTexts {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage-level description of a chunk namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub total_chunks: u64,
    /// Chunk size the namespace was split with.
    pub chunk_size: usize,
    pub created_at: DateTime<Utc>,
}

/// Processed-file cache entry, keyed by content checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    /// Schema version for future evolution
    pub version: u32,
    /// Id given to every text that links this file.
    pub id: TextId,
    pub namespace: String,
    pub chunk_size: usize,
    /// SHA-256 of the file content, hex-encoded
    pub checksum: String,
}

impl ProcessedFile {
    /// Current schema version for ProcessedFile
    pub const CURRENT_VERSION: u32 = 1;

    /// Creates a cache entry for freshly split file content.
    pub fn new(checksum: String, chunk_size: usize) -> Self {
        let id = TextId::new();
        Self {
            version: Self::CURRENT_VERSION,
            id,
            namespace: file_namespace(id),
            chunk_size,
            checksum,
        }
    }
}

/// Cursor state exchanged with a synchronising client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncText {
    pub text_id: TextId,
    pub cursor: Option<u64>,
    pub modified_at: DateTime<Utc>,
    /// Set by the client to delete a text, and by the server for ids it does not know.
    #[serde(default)]
    pub deleted: bool,
}

/// Namespace key for a pasted text.
pub fn text_namespace(id: TextId) -> String {
    format!("text-{}", id)
}

/// Namespace key for a processed file.
pub fn file_namespace(id: TextId) -> String {
    format!("file-{}", id)
}

/// Computes the SHA-256 checksum of file content as a hex string.
pub fn content_checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
