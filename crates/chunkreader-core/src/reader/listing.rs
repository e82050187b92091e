//! Read-only views of a user's collection.

use super::ReaderService;
use crate::error::ReaderError;
use crate::storage::TextStore;
use crate::types::{TextId, TextRecord, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of a text listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSummary {
    pub id: TextId,
    pub name: String,
    pub completion_percent: u8,
}

impl From<&TextRecord> for TextSummary {
    fn from(text: &TextRecord) -> Self {
        Self {
            id: text.id,
            name: text.name.clone(),
            completion_percent: text.completion_percent(),
        }
    }
}

/// A page of a text listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPage {
    pub items: Vec<TextSummary>,
    /// 1-based page number actually served.
    pub page: usize,
    pub has_more: bool,
}

/// A text with all of its chunks, for bulk export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullText {
    pub text: TextRecord,
    pub chunks: Vec<String>,
}

impl<S: TextStore> ReaderService<S> {
    /// Lists the user's texts in collection order.
    ///
    /// Pages are 1-based; page 0 is served as page 1 and a page size of 0
    /// uses the configured default.
    pub async fn list_texts(
        &self,
        user: UserId,
        page: usize,
        page_size: usize,
    ) -> Result<TextPage, ReaderError> {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            self.config.default_page_size
        } else {
            page_size
        };

        let texts = self.store.user_texts(user).await?;
        let skip = (page - 1).saturating_mul(page_size);
        let items = texts
            .texts
            .iter()
            .skip(skip)
            .take(page_size)
            .map(TextSummary::from)
            .collect();
        let has_more = texts.texts.len() > page.saturating_mul(page_size);

        Ok(TextPage {
            items,
            page,
            has_more,
        })
    }

    /// Returns every text with its chunks, optionally only those modified
    /// strictly after `modified_after`.
    pub async fn full_texts(
        &self,
        user: UserId,
        modified_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<FullText>, ReaderError> {
        let texts = self.store.user_texts(user).await?;
        let mut result = Vec::new();
        for text in texts.texts {
            if modified_after.is_some_and(|after| text.modified_at <= after) {
                continue;
            }
            let chunks = self.store.chunks(&text.namespace).await?;
            result.push(FullText { text, chunks });
        }
        Ok(result)
    }

    /// Picks the unfinished text closest to completion.
    ///
    /// Only texts with more than one chunk left qualify; ties go to the
    /// earlier text in the collection.
    pub async fn quick_win(&self, user: UserId) -> Result<TextRecord, ReaderError> {
        let texts = self.store.user_texts(user).await?;
        texts
            .texts
            .into_iter()
            .filter(|t| t.remaining_chunks() > 1)
            .min_by_key(|t| t.remaining_chunks())
            .ok_or_else(|| ReaderError::NotFound("no unfinished text".to_string()))
    }
}
