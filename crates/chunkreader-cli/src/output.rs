//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use chunkreader_core::reader::{FullText, TextPage};
use chunkreader_core::types::SyncText;
use chunkreader_core::{ChunkType, NavigationOutcome, TextRecord};
use serde::Serialize;

/// Maximum characters of a text name shown in listings
const NAME_MAX_LEN: usize = 60;

/// Result of one CLI command.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    Added(TextRecord),
    Chunk(NavigationOutcome),
    /// First-chunk or finished-text state; not a failure.
    Boundary { message: String },
    Texts(TextPage),
    Renamed { old_name: String, new_name: String },
    Deleted(TextRecord),
    ChunkSize { size: usize },
    Split { chunks: Vec<String> },
    Export { texts: Vec<FullText> },
    Sync { updates: Vec<SyncText> },
    QuickWin(TextRecord),
}

/// Formats a report as JSON.
pub fn format_json(report: &Report) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a report for human-readable terminal output.
pub fn format_human(report: &Report) -> String {
    match report {
        Report::Added(text) => format!(
            "Added \"{}\" ({} chunk{})\nid: {}",
            text.name,
            text.chunk_count,
            plural(text.chunk_count),
            text.id
        ),
        Report::Chunk(outcome) => format_chunk(outcome),
        Report::Boundary { message } => message.clone(),
        Report::Texts(page) => format_page(page),
        Report::Renamed { old_name, new_name } => {
            format!("Renamed \"{}\" to \"{}\"", old_name, new_name)
        }
        Report::Deleted(text) => format!("Deleted \"{}\"", text.name),
        Report::ChunkSize { size } => format!("Chunk size: {} characters", size),
        Report::Split { chunks } => chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("--- chunk {} ---\n{}", i + 1, chunk))
            .collect::<Vec<_>>()
            .join("\n\n"),
        Report::Export { texts } => {
            if texts.is_empty() {
                return "No texts to export".to_string();
            }
            texts
                .iter()
                .map(|full| {
                    format!(
                        "{}  {} ({} chunks, {}%)",
                        full.text.id,
                        truncate_text(&full.text.name, NAME_MAX_LEN),
                        full.chunks.len(),
                        full.text.completion_percent()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Report::Sync { updates } => {
            if updates.is_empty() {
                return "Everything in sync".to_string();
            }
            let mut output = format!(
                "{} update{} for the client:\n",
                updates.len(),
                plural(updates.len() as u64)
            );
            for update in updates {
                if update.deleted {
                    output.push_str(&format!("  {}  deleted\n", update.text_id));
                } else {
                    let cursor = update
                        .cursor
                        .map_or("not started".to_string(), |c| format!("chunk {}", c + 1));
                    output.push_str(&format!("  {}  {}\n", update.text_id, cursor));
                }
            }
            output.trim_end().to_string()
        }
        Report::QuickWin(text) => format!(
            "Closest to done: \"{}\" ({} chunks left)\nid: {}",
            text.name,
            text.remaining_chunks(),
            text.id
        ),
    }
}

fn format_chunk(outcome: &NavigationOutcome) -> String {
    let position = match outcome.chunk_type {
        ChunkType::First => " (first)",
        ChunkType::Last if outcome.text.chunk_count == 1 => " (only chunk)",
        ChunkType::Last => " (last)",
        ChunkType::Other => "",
    };
    format!(
        "[{}] {}/{}{}\n\n{}",
        outcome.text.name,
        outcome.chunk_index + 1,
        outcome.text.chunk_count,
        position,
        outcome.chunk
    )
}

fn format_page(page: &TextPage) -> String {
    if page.items.is_empty() {
        return if page.page == 1 {
            "No texts yet".to_string()
        } else {
            format!("No texts on page {}", page.page)
        };
    }

    let mut output = String::new();
    for item in &page.items {
        output.push_str(&format!(
            "{}  {:>3}%  {}\n",
            item.id,
            item.completion_percent,
            truncate_text(&item.name, NAME_MAX_LEN)
        ));
    }
    if page.has_more {
        output.push_str(&format!("More texts: --page {}\n", page.page + 1));
    }
    output.trim_end().to_string()
}

fn plural(count: u64) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Truncates text to a maximum number of characters, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len).collect();
        format!("{}...", truncated.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkreader_core::reader::TextSummary;
    use chunkreader_core::types::{TextId, TextSource};

    fn make_text(name: &str, chunks: u64) -> TextRecord {
        TextRecord::new(TextId::new(), name, TextSource::Text, "ns", chunks)
    }

    #[test]
    fn test_format_chunk_positions() {
        let text = make_text("book", 4);
        let first = NavigationOutcome::new(text.clone(), 0, "One.".to_string());
        let last = NavigationOutcome::new(text, 3, "Four.".to_string());

        let output = format_human(&Report::Chunk(first));
        assert!(output.starts_with("[book] 1/4 (first)"));
        assert!(output.ends_with("One."));
        assert!(format_human(&Report::Chunk(last)).starts_with("[book] 4/4 (last)"));

        let single = NavigationOutcome::new(make_text("note", 1), 0, "Hi.".to_string());
        assert!(format_human(&Report::Chunk(single)).contains("(only chunk)"));
    }

    #[test]
    fn test_format_page() {
        let empty = TextPage {
            items: Vec::new(),
            page: 1,
            has_more: false,
        };
        assert_eq!(format_human(&Report::Texts(empty)), "No texts yet");

        let text = make_text("book", 4);
        let page = TextPage {
            items: vec![TextSummary::from(&text)],
            page: 2,
            has_more: true,
        };
        let output = format_human(&Report::Texts(page));
        assert!(output.contains("book"));
        assert!(output.contains("  0%"));
        assert!(output.contains("--page 3"));
    }

    #[test]
    fn test_format_json_is_tagged() {
        let output = format_json(&Report::ChunkSize { size: 500 });
        assert!(output.contains("\"kind\": \"chunk_size\""));
        assert!(output.contains("\"size\": 500"));

        let text = make_text("book", 2);
        let output = format_json(&Report::Chunk(NavigationOutcome::new(
            text,
            1,
            "Two.".to_string(),
        )));
        assert!(output.contains("\"kind\": \"chunk\""));
        assert!(output.contains("\"chunk_type\": \"last\""));
        assert!(output.contains("\"chunk\": \"Two.\""));
    }

    #[test]
    fn test_format_split() {
        let report = Report::Split {
            chunks: vec!["One.".to_string(), "Two.".to_string()],
        };
        assert_eq!(
            format_human(&report),
            "--- chunk 1 ---\nOne.\n\n--- chunk 2 ---\nTwo."
        );
    }

    #[test]
    fn test_truncate_text() {
        let short = "Short text";
        assert_eq!(truncate_text(short, 50), short);

        let long = "Ünïcödé names can be much longer than the listing column";
        let truncated = truncate_text(long, 20);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 23);
    }
}
