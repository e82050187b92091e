//! Command implementations.
//!
//! Each command maps to one reader operation. Navigation boundaries come back
//! as [`Report::Boundary`] rather than errors so the process exits cleanly.

use crate::output::Report;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use chunkreader_core::chunking::{ChunkingStrategy, SentenceChunker};
use chunkreader_core::storage::TextStore;
use chunkreader_core::types::SyncText;
use chunkreader_core::{NavigationOutcome, ReaderError, ReaderService, TextId, UserId};
use clap::Subcommand;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add pasted text, read from FILE or stdin
    Add {
        name: String,
        file: Option<PathBuf>,
    },

    /// Add an extracted file, reusing cached chunks for identical content
    AddFile {
        file: PathBuf,
        /// Text name (default: file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// List texts with completion
    List {
        #[arg(long, default_value = "1")]
        page: usize,
        /// Texts per page (0 uses the default)
        #[arg(long, default_value = "0")]
        page_size: usize,
    },

    /// Select a text by id or name
    Select { text: String },

    /// Show the next chunk
    Next,

    /// Show the previous chunk
    Prev,

    /// Jump to chunk N (1-based)
    Page {
        #[arg(allow_negative_numbers = true)]
        number: i64,
    },

    /// Show the current chunk
    Current,

    /// Rename the selected text
    Rename { name: String },

    /// Delete a text by id or name
    Delete { text: String },

    /// Show or set the chunk size for new texts
    ChunkSize { size: Option<usize> },

    /// Split text without storing it
    Split { size: usize, file: Option<PathBuf> },

    /// Export texts with their chunks
    Export {
        /// Only texts modified after this RFC 3339 timestamp
        #[arg(long)]
        after: Option<DateTime<Utc>>,
    },

    /// Merge cursor state from a JSON array of sync entries (FILE or stdin)
    Sync { file: Option<PathBuf> },

    /// Suggest the unfinished text closest to completion
    QuickWin,
}

/// Runs a command against the reader for one user.
pub async fn execute<S: TextStore>(
    command: &Command,
    reader: &ReaderService<S>,
    user: UserId,
) -> Result<Report> {
    let report = match command {
        Command::Add { name, file } => {
            let content = read_input(file.as_deref()).await?;
            let text = reader
                .add_text_bytes(user, name, &content)
                .await
                .context("Failed to add text")?;
            Report::Added(text)
        }
        Command::AddFile { file, name } => {
            let content = read_input(Some(file.as_path())).await?;
            let name = match name {
                Some(name) => name.clone(),
                None => file_name(file)?,
            };
            let text = reader
                .add_text_from_file(user, &name, &content)
                .await
                .context("Failed to add file")?;
            Report::Added(text)
        }
        Command::List { page, page_size } => {
            Report::Texts(reader.list_texts(user, *page, *page_size).await?)
        }
        Command::Select { text } => {
            let result = match text.parse::<TextId>() {
                Ok(id) => reader.select_text(user, id).await,
                Err(_) => reader.select_text_by_name(user, text).await,
            };
            navigation_report(result)?
        }
        Command::Next => navigation_report(reader.next_chunk(user).await)?,
        Command::Prev => navigation_report(reader.prev_chunk(user).await)?,
        Command::Page { number } => {
            navigation_report(reader.set_page(user, number.saturating_sub(1)).await)?
        }
        Command::Current => navigation_report(reader.current_or_first_chunk(user).await)?,
        Command::Rename { name } => {
            let old_name = reader
                .rename_text(user, name)
                .await
                .context("Failed to rename text")?;
            Report::Renamed {
                old_name,
                new_name: name.clone(),
            }
        }
        Command::Delete { text } => {
            let removed = match text.parse::<TextId>() {
                Ok(id) => reader.delete_text(user, id).await,
                Err(_) => reader.delete_text_by_name(user, text).await,
            }
            .context("Failed to delete text")?;
            Report::Deleted(removed)
        }
        Command::ChunkSize { size } => {
            if let Some(size) = size {
                reader.set_chunk_size(user, *size).await?;
            }
            Report::ChunkSize {
                size: reader.chunk_size(user).await?,
            }
        }
        Command::Split { size, file } => {
            let content = read_input(file.as_deref()).await?;
            let text = std::str::from_utf8(&content).context("Input is not valid UTF-8")?;
            let chunks = SentenceChunker::new()
                .chunk(text, *size)?
                .into_iter()
                .map(|chunk| chunk.text)
                .collect();
            Report::Split { chunks }
        }
        Command::Export { after } => Report::Export {
            texts: reader.full_texts(user, *after).await?,
        },
        Command::Sync { file } => {
            let content = read_input(file.as_deref()).await?;
            let updates: Vec<SyncText> =
                serde_json::from_slice(&content).context("Failed to parse sync entries")?;
            Report::Sync {
                updates: reader.sync_texts(user, &updates).await?,
            }
        }
        Command::QuickWin => Report::QuickWin(reader.quick_win(user).await?),
    };
    Ok(report)
}

/// Turns the expected navigation boundaries into a report.
fn navigation_report(result: Result<NavigationOutcome, ReaderError>) -> Result<Report> {
    match result {
        Ok(outcome) => Ok(Report::Chunk(outcome)),
        Err(ReaderError::FirstChunk) => Ok(Report::Boundary {
            message: "Already at the first chunk".to_string(),
        }),
        Err(ReaderError::TextFinished) => Ok(Report::Boundary {
            message: "You have finished this text".to_string(),
        }),
        Err(ReaderError::TextNotSelected) => Err(anyhow!(
            "No text selected. Pick one with `cr select <ID or NAME>`"
        )),
        Err(e) => Err(e.into()),
    }
}

async fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut content = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut content)
                .await
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Cannot derive a name from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkreader_core::storage::RedbTextStore;
    use tempfile::TempDir;

    const BOOK: &str = "First chunk.Second chunk.\n\t\tThird chunk.Fourth chunk.";

    fn setup() -> (ReaderService<RedbTextStore>, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = RedbTextStore::open(temp.path().join("texts.redb")).unwrap();
        (ReaderService::new(store), temp)
    }

    async fn add_book(reader: &ReaderService<RedbTextStore>, temp: &TempDir, user: UserId) {
        let path = temp.path().join("book.txt");
        std::fs::write(&path, BOOK).unwrap();
        execute(&Command::ChunkSize { size: Some(5) }, reader, user)
            .await
            .unwrap();
        execute(
            &Command::Add {
                name: "book".to_string(),
                file: Some(path),
            },
            reader,
            user,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_read_through_book() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        add_book(&reader, &temp, user).await;

        let selected = execute(
            &Command::Select {
                text: "book".to_string(),
            },
            &reader,
            user,
        )
        .await
        .unwrap();
        assert!(matches!(selected, Report::Chunk(ref o) if o.chunk == "First chunk."));

        let page = execute(&Command::Page { number: 4 }, &reader, user)
            .await
            .unwrap();
        assert!(matches!(page, Report::Chunk(ref o) if o.chunk_index == 3));

        let finished = execute(&Command::Next, &reader, user).await.unwrap();
        assert!(matches!(finished, Report::Boundary { .. }));
    }

    #[tokio::test]
    async fn test_prev_at_start_is_boundary() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        add_book(&reader, &temp, user).await;
        execute(
            &Command::Select {
                text: "book".to_string(),
            },
            &reader,
            user,
        )
        .await
        .unwrap();

        let report = execute(&Command::Prev, &reader, user).await.unwrap();
        assert!(matches!(report, Report::Boundary { ref message } if message.contains("first")));
    }

    #[tokio::test]
    async fn test_navigation_without_selection_fails() {
        let (reader, _temp) = setup();
        let err = execute(&Command::Current, &reader, UserId::from_i64(0))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No text selected"));
    }

    #[tokio::test]
    async fn test_page_zero_is_out_of_range() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        add_book(&reader, &temp, user).await;
        execute(
            &Command::Select {
                text: "book".to_string(),
            },
            &reader,
            user,
        )
        .await
        .unwrap();

        assert!(execute(&Command::Page { number: 0 }, &reader, user)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_add_file_defaults_name() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "Some notes.").unwrap();

        let report = execute(
            &Command::AddFile {
                file: path,
                name: None,
            },
            &reader,
            user,
        )
        .await
        .unwrap();
        assert!(matches!(report, Report::Added(ref t) if t.name == "notes.txt"));
    }

    #[tokio::test]
    async fn test_delete_by_id_and_sync_file() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        add_book(&reader, &temp, user).await;
        let id = reader.store().user_texts(user).await.unwrap().texts[0].id;

        let sync_path = temp.path().join("sync.json");
        let unknown = TextId::new();
        std::fs::write(
            &sync_path,
            format!(
                r#"[{{"text_id": "{}", "cursor": 1, "modified_at": "2020-01-01T00:00:00Z"}}]"#,
                unknown
            ),
        )
        .unwrap();
        let report = execute(&Command::Sync { file: Some(sync_path) }, &reader, user)
            .await
            .unwrap();
        assert!(matches!(report, Report::Sync { ref updates } if updates.len() == 1 && updates[0].deleted));

        let report = execute(
            &Command::Delete {
                text: id.to_string(),
            },
            &reader,
            user,
        )
        .await
        .unwrap();
        assert!(matches!(report, Report::Deleted(ref t) if t.id == id));
    }

    #[tokio::test]
    async fn test_split_does_not_store() {
        let (reader, temp) = setup();
        let user = UserId::from_i64(0);
        let path = temp.path().join("book.txt");
        std::fs::write(&path, BOOK).unwrap();

        let report = execute(
            &Command::Split {
                size: 5,
                file: Some(path),
            },
            &reader,
            user,
        )
        .await
        .unwrap();
        assert!(matches!(report, Report::Split { ref chunks } if chunks.len() == 4));
        assert!(reader.store().user_texts(user).await.unwrap().texts.is_empty());
    }
}
