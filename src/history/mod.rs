//! Generation history
//!
//! Two independent stores:
//! * [`LocalHistoryStore`] keeps every attempt on the client, capped and
//!   newest first, over a pluggable [`KeyValueStorage`].
//! * [`RemoteHistoryStore`] persists successful generations with their
//!   uploaded image and serves paginated, filterable listings.

pub mod blob;
pub mod local;
pub mod remote;
pub mod storage;
pub mod types;

pub use blob::{sanitize_filename, BlobStore, FsBlobStore};
pub use local::LocalHistoryStore;
pub use remote::RemoteHistoryStore;
pub use storage::{KeyValueStorage, MemoryStorage, SledStorage};
pub use types::{
    prompt_preview, HistoryListItem, HistoryMetadata, HistoryPage, HistoryQuery, HistoryStats,
    LocalHistoryItem, NewHistoryEntry, RemoteHistoryItem,
};
