//! Redb-backed text store.
//!
//! Uses [redb](https://github.com/cberner/redb) - a pure Rust, ACID-compliant,
//! embedded B-tree database. redb serializes write transactions and gives read
//! transactions a snapshot, which is exactly the consistency model the reader
//! needs: every cursor move is one write transaction.
//!
//! # Tables
//!
//! - `users`: user id (i64) -> UserTexts (JSON)
//! - `chunk_sizes`: user id (i64) -> preferred chunk size (u64)
//! - `namespaces`: namespace (string) -> NamespaceRecord (JSON)
//! - `full_texts`: namespace (string) -> unsplit text
//! - `chunks`: (namespace, index) -> chunk text
//! - `processed_files`: checksum (hex string) -> ProcessedFile (JSON)

use super::collection::owns_namespace;
use super::{NamespaceContent, StoreError, TextStore};
use crate::error::ReaderError;
use crate::navigation::{NavigationOutcome, Transition};
use crate::types::{
    NamespaceRecord, ProcessedFile, SyncText, TextId, TextRecord, UserId, UserTexts,
};
use chrono::Utc;
use redb::{Database, ReadableTable, Table, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// Table definitions
const USERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("users");
const CHUNK_SIZES_TABLE: TableDefinition<i64, u64> = TableDefinition::new("chunk_sizes");
const NAMESPACES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("namespaces");
const FULL_TEXTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("full_texts");
const CHUNKS_TABLE: TableDefinition<(&str, u64), &str> = TableDefinition::new("chunks");
const PROCESSED_FILES_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("processed_files");

/// Maps a redb error to [`StoreError::DatabaseError`] with context.
fn db_err<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::DatabaseError(format!("{}: {}", context, e))
}

/// Serializes a record to JSON bytes.
fn encode<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| {
        StoreError::SerializationError(format!("Failed to serialize {}: {}", what, e))
    })
}

/// Deserializes a record from JSON bytes.
fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| {
        StoreError::SerializationError(format!("Failed to deserialize {}: {}", what, e))
    })
}

/// Redb-backed text store for native platforms.
///
/// Each [`TextStore`] mutation runs in a single write transaction; an error
/// anywhere in it drops the transaction, which aborts it.
///
/// # Example
///
/// ```ignore
/// use chunkreader_core::storage::RedbTextStore;
///
/// let store = RedbTextStore::open("./data/texts.redb")?;
/// let texts = store.user_texts(user).await?;
/// ```
pub struct RedbTextStore {
    db: Arc<Database>,
}

impl RedbTextStore {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates the database file and all required tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = Database::create(path)
            .map_err(|e| StoreError::DatabaseError(format!("Failed to open database: {}", e)))?;

        // Create tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(db_err("Failed to begin write transaction"))?;

            write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to create users table"))?;
            write_txn
                .open_table(CHUNK_SIZES_TABLE)
                .map_err(db_err("Failed to create chunk_sizes table"))?;
            write_txn
                .open_table(NAMESPACES_TABLE)
                .map_err(db_err("Failed to create namespaces table"))?;
            write_txn
                .open_table(FULL_TEXTS_TABLE)
                .map_err(db_err("Failed to create full_texts table"))?;
            write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_err("Failed to create chunks table"))?;
            write_txn
                .open_table(PROCESSED_FILES_TABLE)
                .map_err(db_err("Failed to create processed_files table"))?;

            write_txn
                .commit()
                .map_err(db_err("Failed to commit table creation"))?;
        }

        info!("Opened text store at {}", path.display());
        Ok(Self { db: Arc::new(db) })
    }

    fn load_user_texts(
        table: &impl ReadableTable<i64, &'static [u8]>,
        user: UserId,
    ) -> Result<UserTexts, StoreError> {
        match table
            .get(user.as_i64())
            .map_err(db_err("Failed to get user texts"))?
        {
            Some(guard) => decode(guard.value(), "user texts"),
            None => Ok(UserTexts::new()),
        }
    }

    fn save_user_texts(
        table: &mut Table<'_, i64, &'static [u8]>,
        user: UserId,
        texts: &UserTexts,
    ) -> Result<(), StoreError> {
        let bytes = encode(texts, "user texts")?;
        table
            .insert(user.as_i64(), bytes.as_slice())
            .map_err(db_err("Failed to insert user texts"))?;
        Ok(())
    }

    /// Reads a chunk that the navigator is about to return.
    ///
    /// A missing chunk means the collection points past its namespace.
    fn load_chunk(
        table: &impl ReadableTable<(&'static str, u64), &'static str>,
        namespace: &str,
        index: u64,
    ) -> Result<String, StoreError> {
        match table
            .get((namespace, index))
            .map_err(db_err("Failed to get chunk"))?
        {
            Some(guard) => Ok(guard.value().to_string()),
            None => Err(StoreError::Corrupted(format!(
                "chunk {} missing from {}",
                index, namespace
            ))),
        }
    }

    /// Removes a namespace with its full text and chunks.
    fn drop_namespace(
        write_txn: &redb::WriteTransaction,
        namespace: &str,
    ) -> Result<(), StoreError> {
        let mut namespaces = write_txn
            .open_table(NAMESPACES_TABLE)
            .map_err(db_err("Failed to open namespaces table"))?;
        let mut full_texts = write_txn
            .open_table(FULL_TEXTS_TABLE)
            .map_err(db_err("Failed to open full_texts table"))?;
        let mut chunks = write_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_err("Failed to open chunks table"))?;

        let total = match namespaces
            .remove(namespace)
            .map_err(db_err("Failed to delete namespace"))?
        {
            Some(guard) => decode::<NamespaceRecord>(guard.value(), "namespace")?.total_chunks,
            None => 0,
        };
        full_texts
            .remove(namespace)
            .map_err(db_err("Failed to delete full text"))?;
        for index in 0..total {
            chunks
                .remove((namespace, index))
                .map_err(db_err("Failed to delete chunk"))?;
        }

        debug!("Dropped namespace {} ({} chunks)", namespace, total);
        Ok(())
    }

    /// Writes a namespace with its full text and chunks.
    fn write_namespace(
        write_txn: &redb::WriteTransaction,
        namespace: &str,
        record: &TextRecord,
        content: &NamespaceContent<'_>,
    ) -> Result<(), StoreError> {
        let ns_record = NamespaceRecord {
            total_chunks: content.chunks.len() as u64,
            chunk_size: content.chunk_size,
            created_at: record.created_at,
        };
        let bytes = encode(&ns_record, "namespace")?;

        let mut namespaces = write_txn
            .open_table(NAMESPACES_TABLE)
            .map_err(db_err("Failed to open namespaces table"))?;
        namespaces
            .insert(namespace, bytes.as_slice())
            .map_err(db_err("Failed to insert namespace"))?;

        let mut full_texts = write_txn
            .open_table(FULL_TEXTS_TABLE)
            .map_err(db_err("Failed to open full_texts table"))?;
        full_texts
            .insert(namespace, content.full_text)
            .map_err(db_err("Failed to insert full text"))?;

        let mut chunks = write_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_err("Failed to open chunks table"))?;
        for (index, chunk) in content.chunks.iter().enumerate() {
            chunks
                .insert((namespace, index as u64), chunk.as_str())
                .map_err(db_err("Failed to insert chunk"))?;
        }

        if let Some(file) = content.processed_file {
            let bytes = encode(file, "processed file")?;
            let mut files = write_txn
                .open_table(PROCESSED_FILES_TABLE)
                .map_err(db_err("Failed to open processed_files table"))?;
            files
                .insert(file.checksum.as_str(), bytes.as_slice())
                .map_err(db_err("Failed to insert processed file"))?;
        }

        Ok(())
    }
}

#[async_trait::async_trait(?Send)]
impl TextStore for RedbTextStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    async fn user_texts(&self, user: UserId) -> Result<UserTexts, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(USERS_TABLE)
            .map_err(db_err("Failed to open users table"))?;

        Self::load_user_texts(&table, user)
    }

    async fn chunk_size(&self, user: UserId) -> Result<Option<usize>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(CHUNK_SIZES_TABLE)
            .map_err(db_err("Failed to open chunk_sizes table"))?;

        match table.get(user.as_i64()) {
            Ok(Some(guard)) => Ok(Some(guard.value() as usize)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(format!(
                "Failed to get chunk size: {}",
                e
            ))),
        }
    }

    async fn set_chunk_size(&self, user: UserId, chunk_size: usize) -> Result<(), StoreError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        {
            let mut table = write_txn
                .open_table(CHUNK_SIZES_TABLE)
                .map_err(db_err("Failed to open chunk_sizes table"))?;
            table
                .insert(user.as_i64(), chunk_size as u64)
                .map_err(db_err("Failed to insert chunk size"))?;
        }

        write_txn
            .commit()
            .map_err(db_err("Failed to commit chunk size"))?;

        Ok(())
    }

    // =========================================================================
    // Namespace Operations
    // =========================================================================

    async fn namespace(&self, namespace: &str) -> Result<Option<NamespaceRecord>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(NAMESPACES_TABLE)
            .map_err(db_err("Failed to open namespaces table"))?;

        match table.get(namespace) {
            Ok(Some(guard)) => Ok(Some(decode(guard.value(), "namespace")?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(format!(
                "Failed to get namespace: {}",
                e
            ))),
        }
    }

    async fn chunk(&self, namespace: &str, index: u64) -> Result<Option<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_err("Failed to open chunks table"))?;

        match table.get((namespace, index)) {
            Ok(Some(guard)) => Ok(Some(guard.value().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(format!(
                "Failed to get chunk: {}",
                e
            ))),
        }
    }

    async fn chunks(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let namespaces = read_txn
            .open_table(NAMESPACES_TABLE)
            .map_err(db_err("Failed to open namespaces table"))?;
        let chunks = read_txn
            .open_table(CHUNKS_TABLE)
            .map_err(db_err("Failed to open chunks table"))?;

        let total = match namespaces
            .get(namespace)
            .map_err(db_err("Failed to get namespace"))?
        {
            Some(guard) => decode::<NamespaceRecord>(guard.value(), "namespace")?.total_chunks,
            None => return Ok(Vec::new()),
        };

        (0..total)
            .map(|index| Self::load_chunk(&chunks, namespace, index))
            .collect()
    }

    async fn full_text(&self, namespace: &str) -> Result<Option<String>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(FULL_TEXTS_TABLE)
            .map_err(db_err("Failed to open full_texts table"))?;

        let text = table
            .get(namespace)
            .map_err(db_err("Failed to get full text"))?
            .map(|guard| guard.value().to_string());
        Ok(text)
    }

    // =========================================================================
    // Processed-File Cache
    // =========================================================================

    async fn processed_file(&self, checksum: &str) -> Result<Option<ProcessedFile>, StoreError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(db_err("Failed to begin read transaction"))?;
        let table = read_txn
            .open_table(PROCESSED_FILES_TABLE)
            .map_err(db_err("Failed to open processed_files table"))?;

        match table.get(checksum) {
            Ok(Some(guard)) => Ok(Some(decode(guard.value(), "processed file")?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(format!(
                "Failed to get processed file: {}",
                e
            ))),
        }
    }

    // =========================================================================
    // Collection Mutations
    // =========================================================================

    async fn insert_text(
        &self,
        user: UserId,
        record: &TextRecord,
        content: Option<NamespaceContent<'_>>,
    ) -> Result<(), ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;
            let mut texts = Self::load_user_texts(&users, user)?;
            texts.insert(record.clone())?;

            match &content {
                Some(content) => {
                    Self::write_namespace(&write_txn, &record.namespace, record, content)?;
                }
                None => {
                    let namespaces = write_txn
                        .open_table(NAMESPACES_TABLE)
                        .map_err(db_err("Failed to open namespaces table"))?;
                    let exists = namespaces
                        .get(record.namespace.as_str())
                        .map_err(db_err("Failed to get namespace"))?
                        .is_some();
                    if !exists {
                        return Err(ReaderError::NotFound(format!(
                            "namespace {}",
                            record.namespace
                        )));
                    }
                }
            }

            Self::save_user_texts(&mut users, user, &texts)?;
        }

        write_txn
            .commit()
            .map_err(db_err("Failed to commit text"))?;

        Ok(())
    }

    async fn select_text(
        &self,
        user: UserId,
        id: TextId,
    ) -> Result<NavigationOutcome, ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        let outcome = {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;
            let chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_err("Failed to open chunks table"))?;

            let mut texts = Self::load_user_texts(&users, user)?;
            let record = texts.select(id)?.clone();
            let index = record.cursor.unwrap_or(0);
            let chunk = Self::load_chunk(&chunks, &record.namespace, index)?;

            Self::save_user_texts(&mut users, user, &texts)?;
            NavigationOutcome::new(record, index, chunk)
        };

        write_txn
            .commit()
            .map_err(db_err("Failed to commit selection"))?;

        Ok(outcome)
    }

    async fn rename_current_text(
        &self,
        user: UserId,
        new_name: &str,
    ) -> Result<(TextRecord, String), ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        let renamed = {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;

            let mut texts = Self::load_user_texts(&users, user)?;
            let old_name = texts.rename_current(new_name, Utc::now())?;
            let record = texts
                .current()
                .cloned()
                .ok_or(ReaderError::TextNotSelected)?;

            Self::save_user_texts(&mut users, user, &texts)?;
            (record, old_name)
        };

        write_txn
            .commit()
            .map_err(db_err("Failed to commit rename"))?;

        Ok(renamed)
    }

    async fn delete_text(&self, user: UserId, id: TextId) -> Result<TextRecord, ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        let removed = {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;

            let mut texts = Self::load_user_texts(&users, user)?;
            let removed = texts.remove(id)?;
            Self::save_user_texts(&mut users, user, &texts)?;
            removed
        };

        if owns_namespace(&removed) {
            Self::drop_namespace(&write_txn, &removed.namespace)?;
        }

        write_txn
            .commit()
            .map_err(db_err("Failed to commit text deletion"))?;

        Ok(removed)
    }

    async fn apply_transition(
        &self,
        user: UserId,
        transition: Transition,
    ) -> Result<NavigationOutcome, ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        let outcome = {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;
            let chunks = write_txn
                .open_table(CHUNKS_TABLE)
                .map_err(db_err("Failed to open chunks table"))?;

            let mut texts = Self::load_user_texts(&users, user)?;
            let (record, index) = texts.navigate(transition, Utc::now())?;
            let chunk = Self::load_chunk(&chunks, &record.namespace, index)?;

            Self::save_user_texts(&mut users, user, &texts)?;
            NavigationOutcome::new(record, index, chunk)
        };

        write_txn
            .commit()
            .map_err(db_err("Failed to commit cursor"))?;

        Ok(outcome)
    }

    async fn sync_texts(
        &self,
        user: UserId,
        updates: &[SyncText],
    ) -> Result<Vec<SyncText>, ReaderError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(db_err("Failed to begin write transaction"))?;

        let result = {
            let mut users = write_txn
                .open_table(USERS_TABLE)
                .map_err(db_err("Failed to open users table"))?;

            let mut texts = Self::load_user_texts(&users, user)?;
            let result = texts.reconcile(updates);
            Self::save_user_texts(&mut users, user, &texts)?;
            result
        };

        for removed in result.removed.iter().filter(|r| owns_namespace(r)) {
            Self::drop_namespace(&write_txn, &removed.namespace)?;
        }

        write_txn
            .commit()
            .map_err(db_err("Failed to commit sync"))?;

        debug!(
            "Synced {} texts for user {} ({} removed)",
            updates.len(),
            user,
            result.removed.len()
        );
        Ok(result.response)
    }
}
