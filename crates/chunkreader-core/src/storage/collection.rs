//! Operations on a user's text collection.
//!
//! These run inside a store transaction: the store loads the [`UserTexts`]
//! record, applies one of these methods, and writes the record back only if
//! the method succeeded.

use crate::error::ReaderError;
use crate::navigation::Transition;
use crate::types::{SyncText, TextId, TextRecord, TextSource, UserTexts};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Outcome of merging a sync request into a collection.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Entries the client must apply: server-newer cursors and deletion
    /// markers for ids the server does not know.
    pub response: Vec<SyncText>,
    /// Texts deleted at the client's request.
    pub removed: Vec<TextRecord>,
}

impl UserTexts {
    /// The selected text, if any.
    pub fn current(&self) -> Option<&TextRecord> {
        self.current.and_then(|index| self.texts.get(index))
    }

    pub fn get(&self, id: TextId) -> Option<&TextRecord> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TextRecord> {
        self.texts.iter().find(|t| t.name == name)
    }

    fn position(&self, id: TextId) -> Result<usize, ReaderError> {
        self.texts
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ReaderError::NotFound(format!("text {}", id)))
    }

    /// Appends a text. Names and ids are unique within a collection.
    pub fn insert(&mut self, record: TextRecord) -> Result<(), ReaderError> {
        if self.find_by_name(&record.name).is_some() {
            return Err(ReaderError::Conflict(format!(
                "text named '{}' already exists",
                record.name
            )));
        }
        if self.get(record.id).is_some() {
            return Err(ReaderError::Conflict(format!(
                "text {} is already in the collection",
                record.id
            )));
        }
        self.texts.push(record);
        Ok(())
    }

    /// Makes `id` the selected text without touching its cursor.
    pub fn select(&mut self, id: TextId) -> Result<&TextRecord, ReaderError> {
        let index = self.position(id)?;
        self.current = Some(index);
        Ok(&self.texts[index])
    }

    /// Renames the selected text and returns its previous name.
    pub fn rename_current(
        &mut self,
        new_name: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ReaderError> {
        let index = self.current.ok_or(ReaderError::TextNotSelected)?;
        let taken = self
            .texts
            .iter()
            .enumerate()
            .any(|(i, t)| i != index && t.name == new_name);
        if taken {
            return Err(ReaderError::Conflict(format!(
                "text named '{}' already exists",
                new_name
            )));
        }

        let text = self
            .texts
            .get_mut(index)
            .ok_or(ReaderError::TextNotSelected)?;
        let old_name = std::mem::replace(&mut text.name, new_name.to_string());
        text.modified_at = now;
        Ok(old_name)
    }

    /// Removes a text, keeping the selection on the same text when an earlier
    /// one is removed and clearing it when the selected text itself goes.
    pub fn remove(&mut self, id: TextId) -> Result<TextRecord, ReaderError> {
        let index = self.position(id)?;
        let removed = self.texts.remove(index);
        self.current = match self.current {
            Some(current) if current == index => None,
            Some(current) if current > index => Some(current - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Applies `transition` to the selected text.
    ///
    /// Returns the updated record and the chunk index the user is now on.
    /// `modified_at` is bumped only for transitions that persist.
    pub fn navigate(
        &mut self,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<(TextRecord, u64), ReaderError> {
        let index = self.current.ok_or(ReaderError::TextNotSelected)?;
        let text = self
            .texts
            .get_mut(index)
            .ok_or(ReaderError::TextNotSelected)?;

        let chunk_index = transition.apply(text.cursor, text.chunk_count)?;
        if transition.persists(text.cursor) {
            text.cursor = Some(chunk_index);
            text.modified_at = now;
        }
        Ok((text.clone(), chunk_index))
    }

    /// Merges client cursor state using last-writer-wins on `modified_at`.
    ///
    /// A client cursor outside the text's chunk range never wins.
    pub fn reconcile(&mut self, updates: &[SyncText]) -> Reconciliation {
        let mut result = Reconciliation::default();
        let mut pending: HashMap<TextId, &SyncText> = HashMap::new();

        for update in updates {
            if update.deleted {
                if let Ok(removed) = self.remove(update.text_id) {
                    result.removed.push(removed);
                }
                continue;
            }
            pending.insert(update.text_id, update);
        }

        for text in &mut self.texts {
            let Some(update) = pending.remove(&text.id) else {
                continue;
            };
            let cursor_valid = update.cursor.map_or(true, |c| c < text.chunk_count);
            if cursor_valid && update.modified_at > text.modified_at {
                text.cursor = update.cursor;
                text.modified_at = update.modified_at;
                continue;
            }
            result.response.push(SyncText {
                text_id: text.id,
                cursor: text.cursor,
                modified_at: text.modified_at,
                deleted: false,
            });
        }

        for update in updates {
            if pending.remove(&update.text_id).is_some() {
                result.response.push(SyncText {
                    text_id: update.text_id,
                    cursor: None,
                    modified_at: update.modified_at,
                    deleted: true,
                });
            }
        }

        result
    }
}

/// Returns true when deleting `record` should also drop its chunk namespace.
///
/// File namespaces are shared through the processed-file cache and outlive
/// the texts that reference them.
pub fn owns_namespace(record: &TextRecord) -> bool {
    record.source == TextSource::Text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::Duration;

    fn record(name: &str, chunks: u64) -> TextRecord {
        TextRecord::new(TextId::new(), name, TextSource::Text, "ns", chunks)
    }

    fn collection(names: &[&str]) -> UserTexts {
        let mut texts = UserTexts::new();
        for name in names {
            texts.insert(record(name, 4)).unwrap();
        }
        texts
    }

    #[test]
    fn test_insert_rejects_duplicate_name() {
        let mut texts = collection(&["a"]);
        let err = texts.insert(record("a", 2)).unwrap_err();
        assert!(matches!(err, ReaderError::Conflict(_)));
        assert_eq!(texts.texts.len(), 1);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut texts = collection(&["a"]);
        let mut again = texts.texts[0].clone();
        again.name = "b".to_string();
        assert!(matches!(texts.insert(again), Err(ReaderError::Conflict(_))));
    }

    #[test]
    fn test_select_keeps_cursor() {
        let mut texts = collection(&["a", "b"]);
        texts.texts[1].cursor = Some(2);
        let id = texts.texts[1].id;
        let selected = texts.select(id).unwrap();
        assert_eq!(selected.cursor, Some(2));
        assert_eq!(texts.current, Some(1));
        assert!(matches!(
            texts.select(TextId::new()),
            Err(ReaderError::NotFound(_))
        ));
    }

    #[test]
    fn test_rename_current() {
        let mut texts = collection(&["a", "b"]);
        assert!(matches!(
            texts.rename_current("c", Utc::now()),
            Err(ReaderError::TextNotSelected)
        ));

        let id = texts.texts[0].id;
        texts.select(id).unwrap();
        assert!(matches!(
            texts.rename_current("b", Utc::now()),
            Err(ReaderError::Conflict(_))
        ));
        assert_eq!(texts.rename_current("c", Utc::now()).unwrap(), "a");
        assert_eq!(texts.current().unwrap().name, "c");
    }

    #[test]
    fn test_remove_adjusts_selection() {
        let mut texts = collection(&["a", "b", "c"]);
        let (a, c) = (texts.texts[0].id, texts.texts[2].id);
        texts.select(c).unwrap();

        texts.remove(a).unwrap();
        assert_eq!(texts.current().unwrap().name, "c");

        texts.remove(c).unwrap();
        assert_eq!(texts.current, None);
        assert_eq!(texts.texts.len(), 1);
    }

    #[test]
    fn test_navigate_requires_selection() {
        let mut texts = collection(&["a"]);
        assert!(matches!(
            texts.navigate(Transition::Next, Utc::now()),
            Err(ReaderError::TextNotSelected)
        ));
    }

    #[test]
    fn test_navigate_failure_leaves_state() {
        let mut texts = collection(&["a"]);
        let id = texts.texts[0].id;
        texts.select(id).unwrap();
        let before = texts.clone();

        let err = texts
            .navigate(Transition::SetPage(9), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::Validation(ValidationError::PageOutOfRange { .. })
        ));
        assert_eq!(texts, before);
    }

    #[test]
    fn test_current_or_first_opens_unread_text_once() {
        let mut texts = collection(&["a"]);
        let id = texts.texts[0].id;
        texts.select(id).unwrap();

        let (record, index) = texts
            .navigate(Transition::CurrentOrFirst, Utc::now())
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(record.cursor, Some(0));

        let before = texts.clone();
        texts
            .navigate(Transition::CurrentOrFirst, Utc::now())
            .unwrap();
        assert_eq!(texts, before);
    }

    #[test]
    fn test_reconcile_last_writer_wins() {
        let mut texts = collection(&["newer-on-client", "newer-on-server"]);
        let base = texts.texts[0].modified_at;
        let (client_wins, server_wins) = (texts.texts[0].id, texts.texts[1].id);
        texts.texts[1].cursor = Some(3);

        let updates = vec![
            SyncText {
                text_id: client_wins,
                cursor: Some(2),
                modified_at: base + Duration::seconds(60),
                deleted: false,
            },
            SyncText {
                text_id: server_wins,
                cursor: Some(1),
                modified_at: base - Duration::seconds(60),
                deleted: false,
            },
        ];
        let result = texts.reconcile(&updates);

        assert_eq!(texts.texts[0].cursor, Some(2));
        assert_eq!(texts.texts[1].cursor, Some(3));
        assert_eq!(result.response.len(), 1);
        assert_eq!(result.response[0].text_id, server_wins);
        assert_eq!(result.response[0].cursor, Some(3));
    }

    #[test]
    fn test_reconcile_rejects_out_of_range_cursor() {
        let mut texts = collection(&["a"]);
        let id = texts.texts[0].id;
        let updates = vec![SyncText {
            text_id: id,
            cursor: Some(40),
            modified_at: Utc::now() + Duration::hours(1),
            deleted: false,
        }];
        let result = texts.reconcile(&updates);
        assert_eq!(texts.texts[0].cursor, None);
        assert_eq!(result.response.len(), 1);
        assert!(!result.response[0].deleted);
    }

    #[test]
    fn test_reconcile_deletions_and_unknown_ids() {
        let mut texts = collection(&["a", "b"]);
        let a = texts.texts[0].id;
        let unknown = TextId::new();
        let updates = vec![
            SyncText {
                text_id: a,
                cursor: None,
                modified_at: Utc::now(),
                deleted: true,
            },
            SyncText {
                text_id: unknown,
                cursor: Some(1),
                modified_at: Utc::now(),
                deleted: false,
            },
        ];
        let result = texts.reconcile(&updates);

        assert_eq!(texts.texts.len(), 1);
        assert_eq!(result.removed.len(), 1);
        assert_eq!(result.removed[0].id, a);
        assert_eq!(result.response.len(), 1);
        assert_eq!(result.response[0].text_id, unknown);
        assert!(result.response[0].deleted);
    }

    #[test]
    fn test_owns_namespace() {
        let mut text = record("a", 1);
        assert!(owns_namespace(&text));
        text.source = TextSource::File;
        assert!(!owns_namespace(&text));
    }
}
