//! Text store trait for transactional per-user reading state.
//!
//! This module provides the [`TextStore`] trait, which abstracts over the
//! embedded on-disk store (redb) and an in-memory store used in tests.
//!
//! Every mutating method is one atomic read-modify-write: it reads the user's
//! [`UserTexts`] record, validates, and writes the new state, or fails without
//! writing anything.

use super::collection::owns_namespace;
use crate::error::ReaderError;
use crate::navigation::{NavigationOutcome, Transition};
use crate::types::{
    NamespaceRecord, ProcessedFile, SyncText, TextId, TextRecord, UserId, UserTexts,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during text store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error (filesystem)
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database error (redb)
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Stored records disagree, e.g. a namespace is missing a chunk
    #[error("Corrupted store: {0}")]
    Corrupted(String),
}

/// Chunk namespace content written together with a new text.
#[derive(Debug, Clone, Copy)]
pub struct NamespaceContent<'a> {
    pub full_text: &'a str,
    pub chunks: &'a [String],
    /// Chunk size the content was split with.
    pub chunk_size: usize,
    /// Cache entry to register for this namespace (file uploads only).
    pub processed_file: Option<&'a ProcessedFile>,
}

/// Transactional store for texts, chunks and reading cursors.
///
/// # Design Notes
///
/// - Cursor moves go through [`TextStore::apply_transition`], which takes an
///   enumerated [`Transition`] rather than a callback.
/// - No cursor state is cached between calls; the store is the source of truth.
/// - Read-only methods see a consistent snapshot.
#[async_trait::async_trait(?Send)]
pub trait TextStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Returns the user's collection, empty for unknown users.
    async fn user_texts(&self, user: UserId) -> Result<UserTexts, StoreError>;

    /// Returns the user's preferred chunk size, if one was stored.
    async fn chunk_size(&self, user: UserId) -> Result<Option<usize>, StoreError>;

    /// Stores the user's preferred chunk size. Existing texts are not re-split.
    async fn set_chunk_size(&self, user: UserId, chunk_size: usize) -> Result<(), StoreError>;

    // =========================================================================
    // Namespace Operations
    // =========================================================================

    /// Retrieves a namespace's metadata.
    ///
    /// Returns `Ok(None)` if the namespace doesn't exist.
    async fn namespace(&self, namespace: &str) -> Result<Option<NamespaceRecord>, StoreError>;

    /// Retrieves a single chunk.
    async fn chunk(&self, namespace: &str, index: u64) -> Result<Option<String>, StoreError>;

    /// Retrieves every chunk of a namespace in order.
    async fn chunks(&self, namespace: &str) -> Result<Vec<String>, StoreError>;

    /// Retrieves the unsplit text of a namespace.
    async fn full_text(&self, namespace: &str) -> Result<Option<String>, StoreError>;

    // =========================================================================
    // Processed-File Cache
    // =========================================================================

    /// Looks up a processed file by content checksum.
    async fn processed_file(&self, checksum: &str) -> Result<Option<ProcessedFile>, StoreError>;

    // =========================================================================
    // Collection Mutations
    // =========================================================================

    /// Adds `record` to the user's collection.
    ///
    /// With `content`, the namespace named by `record.namespace` is written in
    /// the same transaction (and the processed-file entry, if any). Without it,
    /// the namespace must already exist.
    async fn insert_text(
        &self,
        user: UserId,
        record: &TextRecord,
        content: Option<NamespaceContent<'_>>,
    ) -> Result<(), ReaderError>;

    /// Selects a text and returns its current-or-first chunk.
    async fn select_text(
        &self,
        user: UserId,
        id: TextId,
    ) -> Result<NavigationOutcome, ReaderError>;

    /// Renames the selected text, returning the updated record and the old name.
    async fn rename_current_text(
        &self,
        user: UserId,
        new_name: &str,
    ) -> Result<(TextRecord, String), ReaderError>;

    /// Removes a text from the collection.
    ///
    /// The namespace is dropped for pasted texts and kept for file-derived ones.
    async fn delete_text(&self, user: UserId, id: TextId) -> Result<TextRecord, ReaderError>;

    /// Moves the cursor of the selected text and returns the resulting chunk.
    async fn apply_transition(
        &self,
        user: UserId,
        transition: Transition,
    ) -> Result<NavigationOutcome, ReaderError>;

    /// Merges client cursor state and deletions; see [`UserTexts::reconcile`].
    async fn sync_texts(
        &self,
        user: UserId,
        updates: &[SyncText],
    ) -> Result<Vec<SyncText>, ReaderError>;
}

#[async_trait::async_trait(?Send)]
impl<T: TextStore + ?Sized> TextStore for Arc<T> {
    async fn user_texts(&self, user: UserId) -> Result<UserTexts, StoreError> {
        (**self).user_texts(user).await
    }

    async fn chunk_size(&self, user: UserId) -> Result<Option<usize>, StoreError> {
        (**self).chunk_size(user).await
    }

    async fn set_chunk_size(&self, user: UserId, chunk_size: usize) -> Result<(), StoreError> {
        (**self).set_chunk_size(user, chunk_size).await
    }

    async fn namespace(&self, namespace: &str) -> Result<Option<NamespaceRecord>, StoreError> {
        (**self).namespace(namespace).await
    }

    async fn chunk(&self, namespace: &str, index: u64) -> Result<Option<String>, StoreError> {
        (**self).chunk(namespace, index).await
    }

    async fn chunks(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        (**self).chunks(namespace).await
    }

    async fn full_text(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        (**self).full_text(namespace).await
    }

    async fn processed_file(&self, checksum: &str) -> Result<Option<ProcessedFile>, StoreError> {
        (**self).processed_file(checksum).await
    }

    async fn insert_text(
        &self,
        user: UserId,
        record: &TextRecord,
        content: Option<NamespaceContent<'_>>,
    ) -> Result<(), ReaderError> {
        (**self).insert_text(user, record, content).await
    }

    async fn select_text(
        &self,
        user: UserId,
        id: TextId,
    ) -> Result<NavigationOutcome, ReaderError> {
        (**self).select_text(user, id).await
    }

    async fn rename_current_text(
        &self,
        user: UserId,
        new_name: &str,
    ) -> Result<(TextRecord, String), ReaderError> {
        (**self).rename_current_text(user, new_name).await
    }

    async fn delete_text(&self, user: UserId, id: TextId) -> Result<TextRecord, ReaderError> {
        (**self).delete_text(user, id).await
    }

    async fn apply_transition(
        &self,
        user: UserId,
        transition: Transition,
    ) -> Result<NavigationOutcome, ReaderError> {
        (**self).apply_transition(user, transition).await
    }

    async fn sync_texts(
        &self,
        user: UserId,
        updates: &[SyncText],
    ) -> Result<Vec<SyncText>, ReaderError> {
        (**self).sync_texts(user, updates).await
    }
}

/// A namespace held by [`InMemoryTextStore`].
struct MemoryNamespace {
    record: NamespaceRecord,
    full_text: String,
    chunks: Vec<String>,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, UserTexts>,
    chunk_sizes: HashMap<UserId, usize>,
    namespaces: HashMap<String, MemoryNamespace>,
    processed_files: HashMap<String, ProcessedFile>,
}

impl MemoryState {
    fn texts(&self, user: UserId) -> UserTexts {
        self.users.get(&user).cloned().unwrap_or_default()
    }

    fn read_chunk(&self, namespace: &str, index: u64) -> Result<String, StoreError> {
        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.chunks.get(index as usize))
            .cloned()
            .ok_or_else(|| {
                StoreError::Corrupted(format!("chunk {} missing from {}", index, namespace))
            })
    }
}

/// In-memory text store for testing.
///
/// All state sits behind one lock, so each mutation is atomic like a redb
/// write transaction. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryTextStore {
    state: RwLock<MemoryState>,
}

impl InMemoryTextStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>, StoreError> {
        self.state
            .read()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::DatabaseError(format!("Lock poisoned: {}", e)))
    }
}

#[async_trait::async_trait(?Send)]
impl TextStore for InMemoryTextStore {
    async fn user_texts(&self, user: UserId) -> Result<UserTexts, StoreError> {
        Ok(self.read()?.texts(user))
    }

    async fn chunk_size(&self, user: UserId) -> Result<Option<usize>, StoreError> {
        Ok(self.read()?.chunk_sizes.get(&user).copied())
    }

    async fn set_chunk_size(&self, user: UserId, chunk_size: usize) -> Result<(), StoreError> {
        self.write()?.chunk_sizes.insert(user, chunk_size);
        Ok(())
    }

    async fn namespace(&self, namespace: &str) -> Result<Option<NamespaceRecord>, StoreError> {
        Ok(self
            .read()?
            .namespaces
            .get(namespace)
            .map(|ns| ns.record.clone()))
    }

    async fn chunk(&self, namespace: &str, index: u64) -> Result<Option<String>, StoreError> {
        Ok(self
            .read()?
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.chunks.get(index as usize).cloned()))
    }

    async fn chunks(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()?
            .namespaces
            .get(namespace)
            .map(|ns| ns.chunks.clone())
            .unwrap_or_default())
    }

    async fn full_text(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .read()?
            .namespaces
            .get(namespace)
            .map(|ns| ns.full_text.clone()))
    }

    async fn processed_file(&self, checksum: &str) -> Result<Option<ProcessedFile>, StoreError> {
        Ok(self.read()?.processed_files.get(checksum).cloned())
    }

    async fn insert_text(
        &self,
        user: UserId,
        record: &TextRecord,
        content: Option<NamespaceContent<'_>>,
    ) -> Result<(), ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        texts.insert(record.clone())?;

        match content {
            Some(content) => {
                state.namespaces.insert(
                    record.namespace.clone(),
                    MemoryNamespace {
                        record: NamespaceRecord {
                            total_chunks: content.chunks.len() as u64,
                            chunk_size: content.chunk_size,
                            created_at: record.created_at,
                        },
                        full_text: content.full_text.to_string(),
                        chunks: content.chunks.to_vec(),
                    },
                );
                if let Some(file) = content.processed_file {
                    state
                        .processed_files
                        .insert(file.checksum.clone(), file.clone());
                }
            }
            None => {
                if !state.namespaces.contains_key(&record.namespace) {
                    return Err(ReaderError::NotFound(format!(
                        "namespace {}",
                        record.namespace
                    )));
                }
            }
        }

        state.users.insert(user, texts);
        Ok(())
    }

    async fn select_text(
        &self,
        user: UserId,
        id: TextId,
    ) -> Result<NavigationOutcome, ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        let record = texts.select(id)?.clone();
        let index = record.cursor.unwrap_or(0);
        let chunk = state.read_chunk(&record.namespace, index)?;

        state.users.insert(user, texts);
        Ok(NavigationOutcome::new(record, index, chunk))
    }

    async fn rename_current_text(
        &self,
        user: UserId,
        new_name: &str,
    ) -> Result<(TextRecord, String), ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        let old_name = texts.rename_current(new_name, Utc::now())?;
        let record = texts
            .current()
            .cloned()
            .ok_or(ReaderError::TextNotSelected)?;

        state.users.insert(user, texts);
        Ok((record, old_name))
    }

    async fn delete_text(&self, user: UserId, id: TextId) -> Result<TextRecord, ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        let removed = texts.remove(id)?;

        if owns_namespace(&removed) {
            state.namespaces.remove(&removed.namespace);
            debug!("Dropped namespace {}", removed.namespace);
        }
        state.users.insert(user, texts);
        Ok(removed)
    }

    async fn apply_transition(
        &self,
        user: UserId,
        transition: Transition,
    ) -> Result<NavigationOutcome, ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        let (record, index) = texts.navigate(transition, Utc::now())?;
        let chunk = state.read_chunk(&record.namespace, index)?;

        state.users.insert(user, texts);
        Ok(NavigationOutcome::new(record, index, chunk))
    }

    async fn sync_texts(
        &self,
        user: UserId,
        updates: &[SyncText],
    ) -> Result<Vec<SyncText>, ReaderError> {
        let mut state = self.write()?;
        let mut texts = state.texts(user);
        let result = texts.reconcile(updates);

        for removed in result.removed.iter().filter(|r| owns_namespace(r)) {
            state.namespaces.remove(&removed.namespace);
        }
        state.users.insert(user, texts);
        Ok(result.response)
    }
}
