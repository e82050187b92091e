//! # Chunkreader Core
//!
//! Text segmentation and durable reading cursors.
//!
//! Long texts are split once, at ingestion, into sentence-respecting chunks.
//! Each user then moves a cursor through a text chunk by chunk, and every
//! move is persisted in one transaction so reading resumes exactly where it
//! stopped.
//!
//! ## Modules
//!
//! - [`chunking`] - Tokenizer and sentence-respecting chunk splitter
//! - [`navigation`] - Cursor transitions, chunk classification and completion
//! - [`storage`] - Transactional text store (redb and in-memory)
//! - [`reader`] - Service facade for ingestion, navigation, listing and sync
//! - [`config`] - Production configuration constants
//! - [`error`] - Error types for validation, navigation and storage
//! - [`types`] - Records shared across modules

pub mod chunking;
pub mod config;
pub mod error;
pub mod navigation;
pub mod reader;
pub mod storage;
pub mod types;

pub use error::{ReaderError, ValidationError};
pub use navigation::{ChunkType, NavigationOutcome, Transition};
pub use reader::ReaderService;
pub use types::{TextId, TextRecord, UserId};
