//! Configuration and path resolution for the CLI.
//!
//! The database lives in a data directory chosen by, in order:
//! - the `--data-dir` flag
//! - the `$CHUNKREADER_DATA_DIR` environment variable
//! - the platform data directory

use anyhow::{anyhow, Context, Result};
use chunkreader_core::storage::RedbTextStore;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::info;

/// Database file name
const DATABASE_FILENAME: &str = "texts.redb";

/// Environment variable for a custom data directory
pub const DATA_DIR_ENV: &str = "CHUNKREADER_DATA_DIR";

/// Environment variable for the acting user id
pub const USER_ENV: &str = "CHUNKREADER_USER";

/// Returns the data directory.
///
/// Platform locations:
/// - macOS: `~/Library/Application Support/dev.chunkreader.Chunkreader/`
/// - Linux: `~/.local/share/chunkreader/`
/// - Windows: `%APPDATA%\chunkreader\Chunkreader\data\`
pub fn get_data_dir(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    resolve_data_dir(custom_dir, std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn resolve_data_dir(custom_dir: Option<&PathBuf>, env_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom_dir {
        return Ok(dir.clone());
    }
    if let Some(dir) = env_dir.filter(|d| !d.as_os_str().is_empty()) {
        return Ok(dir);
    }

    ProjectDirs::from("dev", "chunkreader", "Chunkreader")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Returns the path to the database file.
pub fn database_path(custom_dir: Option<&PathBuf>) -> Result<PathBuf> {
    let data_dir = get_data_dir(custom_dir)?;
    Ok(data_dir.join(DATABASE_FILENAME))
}

/// Opens the text store, creating the data directory on first use.
pub fn open_store(custom_dir: Option<&PathBuf>) -> Result<RedbTextStore> {
    let db_path = database_path(custom_dir)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }

    info!("Opening database: {}", db_path.display());
    RedbTextStore::open(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}
