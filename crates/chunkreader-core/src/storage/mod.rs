//! Persistent reading state.
//!
//! This module holds the user's text collections, chunk namespaces, reading
//! cursors and the processed-file cache.
//!
//! # Implementations
//!
//! - [`InMemoryTextStore`] - Lock-protected maps for tests and ephemeral use
//! - [`RedbTextStore`] - Embedded on-disk store (feature `redb-store`)
//!
//! Both share the collection logic in [`UserTexts`](crate::types::UserTexts),
//! so they differ only in how a read-modify-write is made atomic.

mod collection;
mod text_store;

#[cfg(feature = "redb-store")]
mod redb_store;

pub use collection::{owns_namespace, Reconciliation};
pub use text_store::{InMemoryTextStore, NamespaceContent, StoreError, TextStore};

#[cfg(feature = "redb-store")]
pub use redb_store::RedbTextStore;
