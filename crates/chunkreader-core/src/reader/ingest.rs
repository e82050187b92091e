//! Text ingestion: validation, splitting and the processed-file cache.

use super::ReaderService;
use crate::error::{ReaderError, ValidationError};
use crate::storage::{NamespaceContent, TextStore};
use crate::types::{
    content_checksum, text_namespace, ProcessedFile, TextId, TextRecord, TextSource, UserId,
};
use tracing::{debug, info, warn};

impl<S: TextStore> ReaderService<S> {
    /// Splits pasted text with the user's chunk size and stores it.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`] for a bad name or blank text
    /// - [`ReaderError::Conflict`] if the user already has a text with this name
    pub async fn add_text(
        &self,
        user: UserId,
        name: &str,
        text: &str,
    ) -> Result<TextRecord, ReaderError> {
        self.check_new_text(user, name, text).await?;

        let chunk_size = self.chunk_size(user).await?;
        let chunks = self.split(text, chunk_size)?;

        let id = TextId::new();
        let record = TextRecord::new(
            id,
            name,
            TextSource::Text,
            text_namespace(id),
            chunks.len() as u64,
        );
        self.store
            .insert_text(
                user,
                &record,
                Some(NamespaceContent {
                    full_text: text,
                    chunks: &chunks,
                    chunk_size,
                    processed_file: None,
                }),
            )
            .await?;

        info!(
            "Added text '{}' for user {} ({} chunks of ~{} chars)",
            name,
            user,
            chunks.len(),
            chunk_size
        );
        Ok(record)
    }

    /// Like [`add_text`](Self::add_text), for raw bytes that must be UTF-8.
    pub async fn add_text_bytes(
        &self,
        user: UserId,
        name: &str,
        content: &[u8],
    ) -> Result<TextRecord, ReaderError> {
        let text = decode_utf8(content)?;
        self.add_text(user, name, text).await
    }

    /// Stores extracted file content, reusing cached chunks when the same
    /// content was already split with the user's current chunk size.
    ///
    /// The text id is the cache entry's id, so adding the same file twice to
    /// one collection is a [`ReaderError::Conflict`].
    pub async fn add_text_from_file(
        &self,
        user: UserId,
        name: &str,
        content: &[u8],
    ) -> Result<TextRecord, ReaderError> {
        let text = decode_utf8(content)?;
        self.check_new_text(user, name, text).await?;

        let chunk_size = self.chunk_size(user).await?;
        let checksum = content_checksum(content);

        if let Some(cached) = self.store.processed_file(&checksum).await? {
            if cached.chunk_size == chunk_size {
                match self.store.namespace(&cached.namespace).await? {
                    Some(namespace) => {
                        let record = TextRecord::new(
                            cached.id,
                            name,
                            TextSource::File,
                            cached.namespace.clone(),
                            namespace.total_chunks,
                        );
                        self.store.insert_text(user, &record, None).await?;
                        info!(
                            "Linked cached file {} as '{}' for user {} ({} chunks)",
                            &checksum[..12],
                            name,
                            user,
                            namespace.total_chunks
                        );
                        return Ok(record);
                    }
                    None => warn!(
                        "Processed file {} points at missing namespace {}, splitting again",
                        &checksum[..12],
                        cached.namespace
                    ),
                }
            } else {
                debug!(
                    "Processed file {} was split with size {}, need {}",
                    &checksum[..12],
                    cached.chunk_size,
                    chunk_size
                );
            }
        }

        let chunks = self.split(text, chunk_size)?;
        let file = ProcessedFile::new(checksum, chunk_size);
        let record = TextRecord::new(
            file.id,
            name,
            TextSource::File,
            file.namespace.clone(),
            chunks.len() as u64,
        );
        self.store
            .insert_text(
                user,
                &record,
                Some(NamespaceContent {
                    full_text: text,
                    chunks: &chunks,
                    chunk_size,
                    processed_file: Some(&file),
                }),
            )
            .await?;

        info!(
            "Added file '{}' for user {} ({} chunks, checksum {})",
            name,
            user,
            chunks.len(),
            &file.checksum[..12]
        );
        Ok(record)
    }

    /// Validates a new text and rejects names already in the collection.
    async fn check_new_text(&self, user: UserId, name: &str, text: &str) -> Result<(), ReaderError> {
        self.validate_name(name)?;
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let texts = self.store.user_texts(user).await?;
        if texts.find_by_name(name).is_some() {
            return Err(ReaderError::Conflict(format!(
                "text named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    fn split(&self, text: &str, chunk_size: usize) -> Result<Vec<String>, ReaderError> {
        let chunks: Vec<String> = self
            .chunker
            .chunk(text, chunk_size)?
            .into_iter()
            .map(|chunk| chunk.text)
            .collect();
        if chunks.is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        Ok(chunks)
    }
}

fn decode_utf8(content: &[u8]) -> Result<&str, ValidationError> {
    std::str::from_utf8(content).map_err(|e| ValidationError::NotUtf8(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::tests::reader_with_counter;
    use crate::storage::InMemoryTextStore;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_add_text_validation() {
        let reader = ReaderService::new(InMemoryTextStore::new());
        let user = UserId::from_i64(1);

        let cases: Vec<(String, &str, ValidationError)> = vec![
            (String::new(), "text", ValidationError::EmptyTextName),
            ("x".repeat(256), "text", ValidationError::TextNameTooLong { len: 256, max: 255 }),
            ("name".to_string(), " \n\t ", ValidationError::EmptyText),
        ];
        for (name, text, expected) in cases {
            match reader.add_text(user, &name, text).await {
                Err(ReaderError::Validation(err)) => assert_eq!(err, expected),
                other => panic!("expected {:?}, got {:?}", expected, other),
            }
        }
        assert!(reader.store().user_texts(user).await.unwrap().texts.is_empty());
    }

    #[tokio::test]
    async fn test_add_text_bytes_rejects_invalid_utf8() {
        let reader = ReaderService::new(InMemoryTextStore::new());
        let err = reader
            .add_text_bytes(UserId::from_i64(1), "bin", &[0x66, 0xff, 0x6f])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Validation(ValidationError::NotUtf8(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_skips_splitting() {
        let (reader, counter) = reader_with_counter();
        let user = UserId::from_i64(1);
        reader.add_text(user, "book", "One.").await.unwrap();
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        let err = reader.add_text(user, "book", "Two.").await.unwrap_err();
        assert!(matches!(err, ReaderError::Conflict(_)));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_file_cache_reuses_namespace() {
        let (reader, counter) = reader_with_counter();
        let (alice, bob) = (UserId::from_i64(1), UserId::from_i64(2));
        let content = b"First chunk.Second chunk.\n\t\tThird chunk.Fourth chunk.";
        reader.set_chunk_size(alice, 5).await.unwrap();
        reader.set_chunk_size(bob, 5).await.unwrap();

        let first = reader.add_text_from_file(alice, "doc", content).await.unwrap();
        let second = reader.add_text_from_file(bob, "same doc", content).await.unwrap();

        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(first.namespace, second.namespace);
        assert_eq!(second.chunk_count, 4);
        assert_eq!(second.source, TextSource::File);
    }

    #[tokio::test]
    async fn test_file_cache_misses_on_chunk_size_change() {
        let (reader, counter) = reader_with_counter();
        let user = UserId::from_i64(1);
        let content = b"First chunk.Second chunk.";

        reader.set_chunk_size(user, 5).await.unwrap();
        let small = reader.add_text_from_file(user, "small", content).await.unwrap();
        reader.set_chunk_size(user, 100).await.unwrap();
        let large = reader.add_text_from_file(user, "large", content).await.unwrap();

        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_ne!(small.namespace, large.namespace);
        assert_eq!((small.chunk_count, large.chunk_count), (2, 1));

        // The newer entry replaced the cache pointer
        let checksum = content_checksum(content);
        let cached = reader.store().processed_file(&checksum).await.unwrap().unwrap();
        assert_eq!(cached.id, large.id);

        // The older namespace stays readable for its text
        let chunks = reader.store().chunks(&small.namespace).await.unwrap();
        assert_eq!(chunks, vec!["First chunk.", "Second chunk."]);
    }

    #[tokio::test]
    async fn test_same_file_twice_for_one_user_conflicts() {
        let (reader, counter) = reader_with_counter();
        let user = UserId::from_i64(1);
        reader.add_text_from_file(user, "a", b"Text.").await.unwrap();

        let err = reader
            .add_text_from_file(user, "b", b"Text.")
            .await
            .unwrap_err();
        assert!(matches!(err, ReaderError::Conflict(_)));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(reader.store().user_texts(user).await.unwrap().texts.len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_file_text_can_be_relinked() {
        let (reader, counter) = reader_with_counter();
        let user = UserId::from_i64(1);
        let text = reader.add_text_from_file(user, "a", b"Text.").await.unwrap();
        reader.delete_text(user, text.id).await.unwrap();

        let again = reader.add_text_from_file(user, "a", b"Text.").await.unwrap();
        assert_eq!(again.id, text.id);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }
}
