//! Server-side generation history
//!
//! Successful generations are persisted in an embedded `sled` database
//! together with their uploaded image, which goes to a [`BlobStore`].
//!
//! Layout:
//! * tree `records`: `history:{id}` -> JSON [`RemoteHistoryItem`]
//! * tree `history:index`: `timestamp_ms (u64 BE) ++ id` -> `id`
//! * tree `history:blobs`: `id` -> blob key of the uploaded image
//!
//! Iterating the index in reverse yields records newest first. The sled
//! calls block, so async callers go through [`run_blocking`].

use super::blob::{sanitize_filename, BlobStore};
use super::types::{
    now_millis, HistoryMetadata, HistoryPage, HistoryQuery, HistoryStats, NewHistoryEntry,
    RemoteHistoryItem,
};
use crate::error::{FormcraftError, Result};
use crate::gateway::image_mime_type;
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;
use ulid::Ulid;

const RECORDS_TREE: &str = "records";
const INDEX_TREE: &str = "history:index";
const BLOB_KEYS_TREE: &str = "history:blobs";
const RECORD_PREFIX: &str = "history:";

fn record_key(id: &str) -> String {
    format!("{}{}", RECORD_PREFIX, id)
}

fn index_key(timestamp_ms: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&(timestamp_ms.max(0) as u64).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

fn storage_err(action: &str) -> impl Fn(sled::Error) -> FormcraftError + '_ {
    move |e| FormcraftError::Storage(format!("{} failed: {}", action, e))
}

/// Run blocking storage work on the blocking thread pool
///
/// # Errors
///
/// Returns the closure's error, or `FormcraftError::Storage` if the task
/// panicked or was cancelled
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| FormcraftError::Storage(format!("Blocking storage task failed: {}", e)))?
}

/// The sled handles backing a store
#[derive(Clone)]
struct Trees {
    db: Db,
    records: Tree,
    index: Tree,
    blob_keys: Tree,
}

impl Trees {
    fn open(db: Db) -> Result<Self> {
        let records = db
            .open_tree(RECORDS_TREE)
            .map_err(storage_err("Open records tree"))?;
        let index = db
            .open_tree(INDEX_TREE)
            .map_err(storage_err("Open index tree"))?;
        let blob_keys = db
            .open_tree(BLOB_KEYS_TREE)
            .map_err(storage_err("Open blob key tree"))?;
        Ok(Self {
            db,
            records,
            index,
            blob_keys,
        })
    }

    fn load(&self, id: &str) -> Result<Option<RemoteHistoryItem>> {
        match self
            .records
            .get(record_key(id))
            .map_err(storage_err("Get record"))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Load a record reached through the index, skipping orphaned entries
    fn load_indexed(&self, id: &str) -> Result<Option<RemoteHistoryItem>> {
        let item = self.load(id)?;
        if item.is_none() {
            tracing::warn!("Index references missing history record {}", id);
        }
        Ok(item)
    }

    fn blob_key(&self, id: &str) -> Result<Option<String>> {
        Ok(self
            .blob_keys
            .get(id)
            .map_err(storage_err("Get blob key"))?
            .map(|value| String::from_utf8_lossy(&value).into_owned()))
    }

    fn insert(&self, item: &RemoteHistoryItem, blob_key: &str) -> Result<()> {
        let value = serde_json::to_vec(item)?;
        self.records
            .insert(record_key(&item.id), value)
            .map_err(storage_err("Insert record"))?;
        self.blob_keys
            .insert(item.id.as_bytes(), blob_key.as_bytes())
            .map_err(storage_err("Insert blob key"))?;
        self.index
            .insert(
                index_key(item.timestamp.timestamp_millis(), &item.id),
                item.id.as_bytes(),
            )
            .map_err(storage_err("Insert index"))?;
        self.db.flush().map_err(storage_err("Flush"))?;
        Ok(())
    }

    fn remove(&self, item: &RemoteHistoryItem) -> Result<()> {
        self.index
            .remove(index_key(item.timestamp.timestamp_millis(), &item.id))
            .map_err(storage_err("Remove index"))?;
        self.records
            .remove(record_key(&item.id))
            .map_err(storage_err("Remove record"))?;
        self.blob_keys
            .remove(item.id.as_bytes())
            .map_err(storage_err("Remove blob key"))?;
        self.db.flush().map_err(storage_err("Flush"))?;
        Ok(())
    }

    /// Ids in descending timestamp order
    fn ids_newest_first(&self) -> impl Iterator<Item = Result<String>> + '_ {
        self.index.iter().rev().map(|entry| {
            let (_, value) = entry.map_err(storage_err("Iterate index"))?;
            Ok(String::from_utf8_lossy(&value).into_owned())
        })
    }

    /// Records in descending timestamp order
    fn items_newest_first(&self) -> impl Iterator<Item = Result<RemoteHistoryItem>> + '_ {
        self.ids_newest_first()
            .filter_map(move |id| id.and_then(|id| self.load_indexed(&id)).transpose())
    }
}

/// Persistent history of successful generations
pub struct RemoteHistoryStore {
    trees: Trees,
    blobs: Arc<dyn BlobStore>,
}

impl RemoteHistoryStore {
    /// Open or create the store at `path`
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Storage` if the database cannot be opened
    pub fn open(path: impl AsRef<Path>, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            FormcraftError::Storage(format!(
                "Failed to open history database {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_db(db, blobs)
    }

    /// Build the store over an already opened database
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::Storage` if the trees cannot be opened
    pub fn from_db(db: Db, blobs: Arc<dyn BlobStore>) -> Result<Self> {
        Ok(Self {
            trees: Trees::open(db)?,
            blobs,
        })
    }

    /// Persist a generation together with its image
    ///
    /// The image is uploaded first; a failed upload stores nothing. The blob
    /// key is kept next to the record so deletion does not depend on the
    /// public URL the image was published under.
    pub async fn create(&self, entry: NewHistoryEntry) -> Result<RemoteHistoryItem> {
        let id = Ulid::new().to_string();
        let filename = sanitize_filename(&entry.filename);
        let content_type = image_mime_type(&entry.image);
        let image_size = entry.image.len() as u64;

        let blob_key = format!("history/{}/{}", id, filename);
        let input_image_url = self.blobs.put(&blob_key, entry.image, content_type).await?;

        let item = RemoteHistoryItem {
            id: id.clone(),
            timestamp: now_millis(),
            prompt: entry.prompt,
            input_image_url,
            generated_schema: entry.schema,
            metadata: Some(HistoryMetadata {
                image_size: Some(image_size),
                processing_time: entry.processing_time_ms,
                success: true,
                original_filename: Some(entry.filename),
            }),
        };

        let trees = self.trees.clone();
        let stored = item.clone();
        run_blocking(move || trees.insert(&stored, &blob_key)).await?;

        tracing::info!("Saved history record {}", id);
        Ok(item)
    }

    /// One page of history, newest first
    ///
    /// Without filters only the ids before the page are walked and only the
    /// page's records are loaded; an orphaned index entry shortens the page.
    /// With filters every record is examined so `total` reflects the
    /// filtered count.
    pub fn list(&self, query: &HistoryQuery) -> Result<HistoryPage> {
        let offset = query.offset();
        let limit = query.limit();

        let (items, total) = if query.has_filters() {
            let mut matched = Vec::new();
            for item in self.trees.items_newest_first() {
                let item = item?;
                if query.matches(&item) {
                    matched.push(item);
                }
            }
            let total = matched.len();
            let page = matched
                .into_iter()
                .skip(offset)
                .take(limit)
                .map(|item| item.to_list_item())
                .collect();
            (page, total)
        } else {
            let total = self.trees.index.len();
            let mut page = Vec::new();
            for id in self.trees.ids_newest_first().skip(offset).take(limit) {
                if let Some(item) = self.trees.load_indexed(&id?)? {
                    page.push(item.to_list_item());
                }
            }
            (page, total)
        };

        Ok(HistoryPage {
            items,
            total,
            page: query.page(),
            limit,
            has_more: offset.saturating_add(limit) < total,
        })
    }

    /// Full record by id
    pub fn get(&self, id: &str) -> Result<Option<RemoteHistoryItem>> {
        self.trees.load(id)
    }

    /// Delete a record, its index entry and its image
    ///
    /// Returns false if the record does not exist. Image deletion failures
    /// are logged and do not fail the call.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let trees = self.trees.clone();
        let owned_id = id.to_string();
        let found = run_blocking(move || {
            Ok(match trees.load(&owned_id)? {
                Some(item) => Some((trees.blob_key(&owned_id)?, item)),
                None => None,
            })
        })
        .await?;
        let Some((blob_key, item)) = found else {
            return Ok(false);
        };

        match blob_key {
            Some(key) => {
                if let Err(e) = self.blobs.delete(&key).await {
                    tracing::warn!(
                        "Failed to delete image {} for history record {}: {}",
                        key,
                        id,
                        e
                    );
                }
            }
            None => tracing::warn!("No image key recorded for history record {}", id),
        }

        let trees = self.trees.clone();
        run_blocking(move || trees.remove(&item)).await?;

        tracing::info!("Deleted history record {}", id);
        Ok(true)
    }

    /// Counts over every stored record
    pub fn stats(&self) -> Result<HistoryStats> {
        let mut stats = HistoryStats::default();
        for item in self.trees.items_newest_first() {
            stats.total += 1;
            if item?.success() {
                stats.successful += 1;
            } else {
                stats.failed += 1;
            }
        }
        Ok(stats)
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.trees.index.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.trees.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::blob::FsBlobStore;
    use crate::schema::SchemaDocument;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

    fn open_store() -> (TempDir, RemoteHistoryStore) {
        let dir = TempDir::new().unwrap();
        let blobs = Arc::new(FsBlobStore::new(
            dir.path().join("blobs"),
            "http://localhost:3000",
        ));
        let store = RemoteHistoryStore::open(dir.path().join("history.sled"), blobs).unwrap();
        (dir, store)
    }

    fn entry(prompt: &str) -> NewHistoryEntry {
        NewHistoryEntry {
            prompt: prompt.to_string(),
            image: Bytes::from_static(PNG),
            filename: "login form.png".to_string(),
            schema: SchemaDocument::try_from(json!({"type": "object", "properties": {}}))
                .unwrap(),
            processing_time_ms: Some(1200),
        }
    }

    async fn create_spaced(store: &RemoteHistoryStore, prompts: &[&str]) -> Vec<String> {
        let mut ids = Vec::new();
        for prompt in prompts {
            ids.push(store.create(entry(prompt)).await.unwrap().id);
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
        ids
    }

    struct FailingBlobs;

    #[async_trait]
    impl BlobStore for FailingBlobs {
        async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> Result<String> {
            Err(FormcraftError::Blob("bucket unavailable".to_string()).into())
        }
        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            Ok(None)
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(FormcraftError::Blob("bucket unavailable".to_string()).into())
        }
    }

    #[tokio::test]
    async fn test_create_stores_record_and_image() {
        let (dir, store) = open_store();
        let item = store.create(entry("用户注册")).await.unwrap();

        assert!(item
            .input_image_url
            .starts_with(&format!("http://localhost:3000/blobs/history/{}/", item.id)));
        assert!(item.input_image_url.ends_with("loginform.png"));
        let metadata = item.metadata.clone().unwrap();
        assert_eq!(metadata.image_size, Some(PNG.len() as u64));
        assert_eq!(metadata.processing_time, Some(1200));
        assert_eq!(metadata.original_filename.as_deref(), Some("login form.png"));

        let stored = dir
            .path()
            .join("blobs/history")
            .join(&item.id)
            .join("loginform.png");
        assert_eq!(std::fs::read(stored).unwrap(), PNG);
        assert_eq!(store.get(&item.id).unwrap(), Some(item));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_list_newest_first_with_pagination() {
        let (_dir, store) = open_store();
        let ids = create_spaced(&store, &["a", "b", "c", "d", "e"]).await;

        let first = store.list(&HistoryQuery::new(1, 2)).unwrap();
        assert_eq!(first.total, 5);
        assert!(first.has_more);
        let first_ids: Vec<&str> = first.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(first_ids, vec![ids[4].as_str(), ids[3].as_str()]);

        let last = store.list(&HistoryQuery::new(3, 2)).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, ids[0]);
        assert!(!last.has_more);

        let beyond = store.list(&HistoryQuery::new(9, 2)).unwrap();
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 5);
    }

    #[tokio::test]
    async fn test_list_search_counts_filtered_total() {
        let (_dir, store) = open_store();
        create_spaced(&store, &["Login page", "Shipping", "login modal"]).await;

        let page = store
            .list(&HistoryQuery::new(1, 1).with_search("LOGIN"))
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].prompt, "login modal");
        assert!(page.has_more);

        let failed = store
            .list(&HistoryQuery::new(1, 10).with_success(false))
            .unwrap();
        assert_eq!(failed.total, 0);
    }

    #[tokio::test]
    async fn test_list_item_has_preview() {
        let (_dir, store) = open_store();
        let long = "字".repeat(150);
        store.create(entry(&long)).await.unwrap();
        let page = store.list(&HistoryQuery::new(1, 12)).unwrap();
        assert_eq!(page.items[0].prompt_preview.chars().count(), 103);
        assert!(page.items[0].prompt_preview.ends_with("..."));
    }

    #[tokio::test]
    async fn test_delete_removes_record_index_and_image() {
        let (dir, store) = open_store();
        let item = store.create(entry("x")).await.unwrap();

        assert!(store.delete(&item.id).await.unwrap());
        assert!(store.get(&item.id).unwrap().is_none());
        assert!(store.is_empty());
        assert!(!dir.path().join("blobs/history").join(&item.id).exists());
        assert!(!store.delete(&item.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats() {
        let (_dir, store) = open_store();
        assert_eq!(store.stats().unwrap(), HistoryStats::default());
        create_spaced(&store, &["a", "b"]).await;
        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_upload_stores_nothing() {
        let dir = TempDir::new().unwrap();
        let store =
            RemoteHistoryStore::open(dir.path().join("h.sled"), Arc::new(FailingBlobs)).unwrap();
        let err = store.create(entry("x")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormcraftError>(),
            Some(FormcraftError::Blob(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_tolerates_blob_failure() {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("h.sled")).unwrap();
        let good = RemoteHistoryStore::from_db(
            db.clone(),
            Arc::new(FsBlobStore::new(dir.path().join("b"), "http://h")),
        )
        .unwrap();
        let item = good.create(entry("x")).await.unwrap();

        let failing = RemoteHistoryStore::from_db(db, Arc::new(FailingBlobs)).unwrap();
        assert!(failing.delete(&item.id).await.unwrap());
        assert!(failing.get(&item.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_orphaned_index_entry_is_skipped() {
        let (_dir, store) = open_store();
        let item = store.create(entry("x")).await.unwrap();
        store.trees.records.remove(record_key(&item.id)).unwrap();

        let page = store.list(&HistoryQuery::new(1, 10)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, store.len());
        assert_eq!(page.total, 1);
        assert_eq!(store.stats().unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_huge_page_number_is_past_the_end() {
        let (_dir, store) = open_store();
        let empty = store.list(&HistoryQuery::new(usize::MAX, 100)).unwrap();
        assert!(empty.items.is_empty());
        assert!(!empty.has_more);

        create_spaced(&store, &["a", "b", "c"]).await;
        let page = store.list(&HistoryQuery::new(usize::MAX, 100)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_more);

        let filtered = store
            .list(&HistoryQuery::new(usize::MAX, usize::MAX).with_search("a"))
            .unwrap();
        assert!(filtered.items.is_empty());
        assert!(!filtered.has_more);
    }

    #[tokio::test]
    async fn test_unfiltered_page_skips_ids_before_loading() {
        let (_dir, store) = open_store();
        let ids = create_spaced(&store, &["a", "b", "c", "d"]).await;
        // Records before the requested page are never deserialized.
        store
            .trees
            .records
            .insert(record_key(&ids[3]), b"not json".to_vec())
            .unwrap();

        let page = store.list(&HistoryQuery::new(2, 2)).unwrap();
        let page_ids: Vec<&str> = page.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(page_ids, vec![ids[1].as_str(), ids[0].as_str()]);
        assert!(store.list(&HistoryQuery::new(1, 2)).is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_image_after_public_url_change() {
        let dir = TempDir::new().unwrap();
        let db = sled::open(dir.path().join("h.sled")).unwrap();
        let before = RemoteHistoryStore::from_db(
            db.clone(),
            Arc::new(FsBlobStore::new(dir.path().join("blobs"), "http://old.test")),
        )
        .unwrap();
        let item = before.create(entry("x")).await.unwrap();
        assert!(item.input_image_url.starts_with("http://old.test/"));
        let image_dir = dir.path().join("blobs/history").join(&item.id);
        assert!(image_dir.exists());

        let after = RemoteHistoryStore::from_db(
            db,
            Arc::new(FsBlobStore::new(
                dir.path().join("blobs"),
                "https://forms.example.org",
            )),
        )
        .unwrap();
        assert!(after.delete(&item.id).await.unwrap());
        assert!(!image_dir.exists());
        assert!(after.trees.blob_key(&item.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_blocking_returns_closure_result() {
        assert_eq!(run_blocking(|| Ok(7)).await.unwrap(), 7);
        let err = run_blocking::<(), _>(|| Err(FormcraftError::Storage("x".into()).into()))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormcraftError>(),
            Some(FormcraftError::Storage(_))
        ));
    }
}
