//! Client-side generation history
//!
//! Every generation attempt, successful or not, is kept in a single JSON
//! array under one storage key, newest first and capped in length. When no
//! storage is available every operation is a no-op; storage failures are
//! logged and treated the same way.

use super::storage::KeyValueStorage;
use super::types::{contains_ignore_case, now_millis, LocalHistoryItem};
use crate::config::HistoryConfig;
use crate::schema::SchemaDocument;
use std::sync::Arc;
use ulid::Ulid;

/// Capped, newest-first history of generation attempts
#[derive(Clone)]
pub struct LocalHistoryStore {
    storage: Option<Arc<dyn KeyValueStorage>>,
    key: String,
    cap: usize,
}

impl LocalHistoryStore {
    /// Create a store over the given storage
    ///
    /// A cap of 0 is raised to 1.
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>, cap: usize) -> Self {
        Self {
            storage: Some(storage),
            key: key.into(),
            cap: cap.max(1),
        }
    }

    /// Create a store using the configured key and cap
    pub fn from_config(storage: Arc<dyn KeyValueStorage>, config: &HistoryConfig) -> Self {
        Self::new(storage, config.local_key.clone(), config.local_cap)
    }

    /// Create a store without backing storage; all operations are no-ops
    pub fn unavailable() -> Self {
        Self {
            storage: None,
            key: String::new(),
            cap: 1,
        }
    }

    /// Whether backing storage is present
    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    /// Maximum number of retained items
    pub fn cap(&self) -> usize {
        self.cap
    }

    fn load(&self) -> Vec<LocalHistoryItem> {
        let Some(storage) = &self.storage else {
            return Vec::new();
        };
        match storage.get(&self.key) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::error!("Failed to decode local history: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!("Failed to load local history: {}", e);
                Vec::new()
            }
        }
    }

    /// Persist the list; returns whether the write went through
    fn save(&self, items: &[LocalHistoryItem]) -> bool {
        let Some(storage) = &self.storage else {
            return false;
        };
        let result = serde_json::to_vec(items)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| storage.set(&self.key, &bytes));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to save local history: {}", e);
                false
            }
        }
    }

    /// Record a generation attempt
    ///
    /// The item is prepended and the list truncated to the cap. The created
    /// item is returned even when nothing could be persisted.
    pub fn add(
        &self,
        prompt: impl Into<String>,
        image_base64: impl Into<String>,
        schema: Option<SchemaDocument>,
        success: bool,
    ) -> LocalHistoryItem {
        let item = LocalHistoryItem {
            id: Ulid::new().to_string(),
            timestamp: now_millis(),
            prompt: prompt.into(),
            image: image_base64.into(),
            schema,
            success,
        };

        if self.is_available() {
            let mut items = self.load();
            items.insert(0, item.clone());
            items.truncate(self.cap);
            if self.save(&items) {
                tracing::debug!("Recorded local history item {}", item.id);
            }
        }

        item
    }

    /// All items, newest first
    pub fn list(&self) -> Vec<LocalHistoryItem> {
        self.load()
    }

    /// Items whose prompt contains `text`, ignoring case
    ///
    /// Blank text returns the full list.
    pub fn search(&self, text: &str) -> Vec<LocalHistoryItem> {
        let items = self.load();
        if text.trim().is_empty() {
            return items;
        }
        items
            .into_iter()
            .filter(|item| contains_ignore_case(&item.prompt, text))
            .collect()
    }

    /// Look up an item by id
    pub fn get(&self, id: &str) -> Option<LocalHistoryItem> {
        self.load().into_iter().find(|item| item.id == id)
    }

    /// Delete an item
    ///
    /// Returns false if it did not exist or the updated list could not be
    /// written back.
    pub fn delete(&self, id: &str) -> bool {
        let mut items = self.load();
        let before = items.len();
        items.retain(|item| item.id != id);
        if items.len() == before {
            return false;
        }
        self.save(&items)
    }

    /// Remove every item
    pub fn clear(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.remove(&self.key) {
            tracing::error!("Failed to clear local history: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormcraftError, Result};
    use crate::history::storage::MemoryStorage;
    use serde_json::json;

    fn store(cap: usize) -> LocalHistoryStore {
        LocalHistoryStore::new(Arc::new(MemoryStorage::new()), "formcraft_history", cap)
    }

    fn schema() -> SchemaDocument {
        SchemaDocument::try_from(json!({"type": "object", "properties": {}})).unwrap()
    }

    struct FailingStorage;

    impl KeyValueStorage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(FormcraftError::Storage("quota exceeded".to_string()).into())
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(FormcraftError::Storage("quota exceeded".to_string()).into())
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(FormcraftError::Storage("quota exceeded".to_string()).into())
        }
    }

    #[test]
    fn test_add_prepends_newest_first() {
        let store = store(50);
        let first = store.add("first", "AAAA", Some(schema()), true);
        let second = store.add("second", "BBBB", None, false);

        let items = store.list();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
        assert!(!items[0].success);
        assert!(items[0].schema.is_none());
    }

    #[test]
    fn test_cap_keeps_most_recent_items() {
        let store = store(3);
        let ids: Vec<String> = (0..7)
            .map(|i| store.add(format!("prompt {}", i), "AAAA", None, true).id)
            .collect();

        let items = store.list();
        assert_eq!(items.len(), 3);
        let kept: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(kept, vec![&ids[6][..], &ids[5][..], &ids[4][..]]);
        assert!(items
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let store = store(50);
        store.add("User Login form", "AAAA", None, true);
        store.add("Shipping address", "AAAA", None, true);

        let hits = store.search("login");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].prompt, "User Login form");
        assert_eq!(store.search("").len(), 2);
        assert!(store.search("invoice").is_empty());
    }

    #[test]
    fn test_get_and_delete() {
        let store = store(50);
        let item = store.add("p", "AAAA", Some(schema()), true);
        assert_eq!(store.get(&item.id), Some(item.clone()));

        assert!(store.delete(&item.id));
        assert!(store.get(&item.id).is_none());
        assert!(!store.delete(&item.id));
    }

    struct ReadOnlyStorage(Arc<MemoryStorage>);

    impl KeyValueStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(FormcraftError::Storage("read-only".to_string()).into())
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(FormcraftError::Storage("read-only".to_string()).into())
        }
    }

    #[test]
    fn test_delete_reports_failed_write() {
        let memory = Arc::new(MemoryStorage::new());
        let writer = LocalHistoryStore::new(memory.clone(), "k", 10);
        let item = writer.add("p", "AAAA", None, true);

        let store = LocalHistoryStore::new(Arc::new(ReadOnlyStorage(memory)), "k", 10);
        assert!(!store.delete(&item.id));
        assert_eq!(store.get(&item.id), Some(item));
    }

    #[test]
    fn test_delete_unknown_leaves_list_untouched() {
        let store = store(50);
        store.add("a", "AAAA", None, true);
        assert!(!store.delete("missing"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = store(50);
        store.add("a", "AAAA", None, true);
        store.add("b", "AAAA", None, true);
        store.clear();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_unavailable_store_is_noop() {
        let store = LocalHistoryStore::unavailable();
        let item = store.add("a", "AAAA", None, true);
        assert_eq!(item.prompt, "a");
        assert!(store.list().is_empty());
        assert!(!store.delete(&item.id));
        store.clear();
    }

    #[test]
    fn test_failing_storage_degrades_to_noop() {
        let store = LocalHistoryStore::new(Arc::new(FailingStorage), "k", 10);
        store.add("a", "AAAA", None, true);
        assert!(store.list().is_empty());
        store.clear();
    }

    #[test]
    fn test_corrupt_payload_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("k", b"not json").unwrap();
        let store = LocalHistoryStore::new(storage, "k", 10);
        assert!(store.list().is_empty());
        store.add("a", "AAAA", None, true);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_from_config_uses_cap_and_key() {
        let storage = Arc::new(MemoryStorage::new());
        let config = HistoryConfig {
            local_cap: 2,
            local_key: "custom".to_string(),
            ..Default::default()
        };
        let store = LocalHistoryStore::from_config(storage.clone(), &config);
        store.add("a", "AAAA", None, true);
        assert!(storage.get("custom").unwrap().is_some());
        assert_eq!(store.cap(), 2);
    }
}
