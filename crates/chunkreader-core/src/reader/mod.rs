//! Reader service: the entry point collaborators call.
//!
//! [`ReaderService`] ties a [`TextStore`] to a [`ChunkingStrategy`] and a
//! [`ReaderConfig`]. It validates caller input, splits texts at ingestion and
//! forwards every cursor move to the store as one [`Transition`], so each
//! operation maps to a single store transaction.
//!
//! # Example
//!
//! ```ignore
//! use chunkreader_core::reader::ReaderService;
//! use chunkreader_core::storage::RedbTextStore;
//!
//! let reader = ReaderService::new(RedbTextStore::open("texts.redb")?);
//! let text = reader.add_text(user, "notes", &content).await?;
//! reader.select_text(user, text.id).await?;
//! let outcome = reader.next_chunk(user).await?;
//! println!("{}", outcome.chunk);
//! ```

mod ingest;
mod listing;

pub use listing::{FullText, TextPage, TextSummary};

use crate::chunking::{ChunkingStrategy, SentenceChunker};
use crate::config::ReaderConfig;
use crate::error::{ReaderError, ValidationError};
use crate::navigation::{NavigationOutcome, Transition};
use crate::storage::TextStore;
use crate::types::{SyncText, TextId, TextRecord, UserId};
use std::sync::Arc;
use tracing::{debug, info};

/// Ingestion, navigation and listing over a [`TextStore`].
pub struct ReaderService<S> {
    store: S,
    chunker: Arc<dyn ChunkingStrategy>,
    config: ReaderConfig,
}

impl<S: TextStore> ReaderService<S> {
    /// Creates a service with the sentence chunker and default configuration.
    pub fn new(store: S) -> Self {
        Self::with_chunker(store, Arc::new(SentenceChunker::new()), ReaderConfig::default())
    }

    /// Creates a service with an explicit chunking strategy and configuration.
    pub fn with_chunker(
        store: S,
        chunker: Arc<dyn ChunkingStrategy>,
        config: ReaderConfig,
    ) -> Self {
        debug!("Reader service using '{}' chunker", chunker.name());
        Self {
            store,
            chunker,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    // =========================================================================
    // Chunk Size
    // =========================================================================

    /// Returns the user's chunk size, or the configured default.
    pub async fn chunk_size(&self, user: UserId) -> Result<usize, ReaderError> {
        let stored = self.store.chunk_size(user).await?;
        Ok(stored.unwrap_or(self.config.default_chunk_size))
    }

    /// Stores the user's chunk size for future ingestions.
    ///
    /// Texts already ingested keep the chunks they were split into.
    pub async fn set_chunk_size(&self, user: UserId, size: usize) -> Result<(), ReaderError> {
        let max = self.config.max_chunk_size;
        if size == 0 || size > max {
            return Err(ValidationError::InvalidChunkSize { size, max }.into());
        }
        self.store.set_chunk_size(user, size).await?;
        info!("Chunk size for user {} set to {}", user, size);
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Selects a text and returns the chunk at its cursor (or the first one).
    pub async fn select_text(
        &self,
        user: UserId,
        id: TextId,
    ) -> Result<NavigationOutcome, ReaderError> {
        self.store.select_text(user, id).await
    }

    pub async fn select_text_by_name(
        &self,
        user: UserId,
        name: &str,
    ) -> Result<NavigationOutcome, ReaderError> {
        let id = self.resolve_name(user, name).await?;
        self.select_text(user, id).await
    }

    /// Moves to the next chunk of the selected text.
    pub async fn next_chunk(&self, user: UserId) -> Result<NavigationOutcome, ReaderError> {
        self.store.apply_transition(user, Transition::Next).await
    }

    /// Moves to the previous chunk of the selected text.
    pub async fn prev_chunk(&self, user: UserId) -> Result<NavigationOutcome, ReaderError> {
        self.store.apply_transition(user, Transition::Prev).await
    }

    /// Jumps to a 0-based chunk index of the selected text.
    pub async fn set_page(
        &self,
        user: UserId,
        page: i64,
    ) -> Result<NavigationOutcome, ReaderError> {
        self.store
            .apply_transition(user, Transition::SetPage(page))
            .await
    }

    /// Returns the chunk at the cursor. An unread text is opened at its
    /// first chunk.
    pub async fn current_or_first_chunk(
        &self,
        user: UserId,
    ) -> Result<NavigationOutcome, ReaderError> {
        self.store
            .apply_transition(user, Transition::CurrentOrFirst)
            .await
    }

    // =========================================================================
    // Structural Operations
    // =========================================================================

    /// Renames the selected text and returns its previous name.
    pub async fn rename_text(&self, user: UserId, new_name: &str) -> Result<String, ReaderError> {
        self.validate_name(new_name)?;
        let (record, old_name) = self.store.rename_current_text(user, new_name).await?;
        info!(
            "Renamed text {} from '{}' to '{}'",
            record.id, old_name, record.name
        );
        Ok(old_name)
    }

    /// Deletes a text from the user's collection.
    pub async fn delete_text(&self, user: UserId, id: TextId) -> Result<TextRecord, ReaderError> {
        let removed = self.store.delete_text(user, id).await?;
        info!("Deleted text '{}' ({}) for user {}", removed.name, id, user);
        Ok(removed)
    }

    pub async fn delete_text_by_name(
        &self,
        user: UserId,
        name: &str,
    ) -> Result<TextRecord, ReaderError> {
        let id = self.resolve_name(user, name).await?;
        self.delete_text(user, id).await
    }

    /// Merges client cursor state and returns the entries the client must apply.
    pub async fn sync_texts(
        &self,
        user: UserId,
        updates: &[SyncText],
    ) -> Result<Vec<SyncText>, ReaderError> {
        self.store.sync_texts(user, updates).await
    }

    async fn resolve_name(&self, user: UserId, name: &str) -> Result<TextId, ReaderError> {
        let texts = self.store.user_texts(user).await?;
        texts
            .find_by_name(name)
            .map(|t| t.id)
            .ok_or_else(|| ReaderError::NotFound(format!("text named '{}'", name)))
    }

    fn validate_name(&self, name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyTextName);
        }
        let max = self.config.max_text_name_bytes;
        if name.len() > max {
            return Err(ValidationError::TextNameTooLong {
                len: name.len(),
                max,
            });
        }
        Ok(())
    }
}
