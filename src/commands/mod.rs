//! Command handlers for the CLI
//!
//! - `serve`    run the HTTP API
//! - `generate` generate a schema from an image file
//! - `history`  local history (list, show, delete, clear)
//! - `remote`   remote history browser

pub mod generate;
pub mod history;
pub mod remote;
pub mod serve;

use crate::config::Config;
use crate::error::Result;
use crate::history::{FsBlobStore, LocalHistoryStore, RemoteHistoryStore, SledStorage};
use std::sync::Arc;

/// Open the on-disk local history store
pub(crate) fn open_local_store(config: &Config) -> Result<LocalHistoryStore> {
    let storage = SledStorage::open(config.storage.local_db_path()?)?;
    Ok(LocalHistoryStore::from_config(
        Arc::new(storage),
        &config.history,
    ))
}

/// Open the remote history store directly, without a running server
pub(crate) fn open_remote_store(config: &Config) -> Result<RemoteHistoryStore> {
    let blobs = Arc::new(FsBlobStore::new(
        config.storage.blob_dir()?,
        config.server.public_base_url.clone(),
    ));
    RemoteHistoryStore::open(config.storage.remote_db_path()?, blobs)
}

/// Shorten `text` to at most `max` characters for table cells
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
