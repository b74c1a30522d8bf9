//! JSON-file implementation of dataset metadata storage
//!
//! The table itself lives in the [`SharedRegistry`] so every store attached
//! to the same (namespace, workspace) sees the same records. Each store
//! keeps its own pending-flush flag; the digest of the snapshot file as the
//! deployment last loaded or wrote it is shared with the table.
//!
//! Flushing serializes whatever the table holds at flush time. If the file
//! on disk no longer matches the last-known digest, a writer outside this
//! deployment replaced it; the snapshot is still written, then read back and
//! used as the table content. Concurrent writers in separate deployments
//! can therefore lose updates: the last writer to flush, then reload, wins.

use crate::collate::{NameCollator, collator_for};
use crate::page::{PageQuery, paginate};
use crate::registry::{NamespaceShared, SharedRegistry, Table};
use crate::snapshot;
use crate::storage::{DatasetStorage, PageRows};
use async_trait::async_trait;
use dsmeta_common::config::{Config, PaginationConfig};
use dsmeta_common::{DatasetRecord, DropResult, Error, Result, SortDirection, SortField};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

const STORAGE_NAME: &str = "JsonDatasetStorage";

/// Result of one flush attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No mutation was pending
    Skipped,
    /// The snapshot was written
    Written,
    /// The snapshot was written over an externally modified file and the
    /// table was reloaded from it
    Reloaded,
}

/// Handles obtained by `initialize`
struct Attached {
    shared: Arc<NamespaceShared>,
    storage_updated: Arc<AtomicBool>,
}

/// Dataset metadata storage backed by a JSON snapshot file
pub struct JsonDatasetStorage {
    namespace: String,
    workspace: String,
    file_name: PathBuf,
    registry: Arc<SharedRegistry>,
    collator: Arc<dyn NameCollator>,
    pagination: PaginationConfig,
    attached: OnceCell<Attached>,
}

impl JsonDatasetStorage {
    /// Create a store for the configured namespace and workspace.
    ///
    /// Creates the workspace directory; no data is read until
    /// [`DatasetStorage::initialize`].
    pub fn new(config: &Config, registry: Arc<SharedRegistry>) -> Result<Self> {
        let storage = &config.storage;
        std::fs::create_dir_all(storage.workspace_dir())?;
        Ok(Self {
            namespace: storage.namespace.clone(),
            workspace: storage.workspace.clone(),
            file_name: storage.snapshot_path(&storage.namespace),
            registry,
            collator: collator_for(config.sort.name_collation),
            pagination: config.pagination.clone(),
            attached: OnceCell::new(),
        })
    }

    /// Replace the name collator
    #[must_use]
    pub fn with_collator(mut self, collator: Arc<dyn NameCollator>) -> Self {
        self.collator = collator;
        self
    }

    /// Path of the backing snapshot file
    #[must_use]
    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    /// Whether `initialize` has completed
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.attached.get().is_some()
    }

    /// Whether this store's pending-flush flag is set
    #[must_use]
    pub fn has_pending_flush(&self) -> bool {
        self.attached
            .get()
            .is_some_and(|a| a.storage_updated.load(Ordering::Acquire))
    }

    fn attached(&self) -> Result<&Attached> {
        self.attached
            .get()
            .ok_or_else(|| Error::not_initialized(STORAGE_NAME))
    }

    /// Run the flush protocol, reporting what happened
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let attached = self.attached()?;
        let mut table = attached.shared.lock().await;
        if !attached.storage_updated.load(Ordering::Acquire) {
            return Ok(FlushOutcome::Skipped);
        }

        debug!(
            "[{}] Process {} dataset metadata writing {} records to {}",
            self.workspace,
            std::process::id(),
            table.len(),
            self.namespace
        );

        let on_disk = snapshot::read_digest(&self.file_name).await?;
        let conflict = on_disk.is_some() && on_disk != attached.shared.digest();

        let mut digest = snapshot::write(&self.file_name, &table).await?;
        let mut outcome = FlushOutcome::Written;

        if conflict {
            warn!(
                "[{}] Process {} found {} modified externally, reloading after write",
                attached.shared.key(),
                std::process::id(),
                self.file_name.display()
            );
            let reloaded = snapshot::load(&self.file_name).await;
            if let Some(loaded) = reloaded.table {
                *table = loaded;
                outcome = FlushOutcome::Reloaded;
            }
            if let Some(d) = reloaded.digest {
                digest = d;
            }
        }

        attached.shared.set_digest(Some(digest));
        attached.shared.clear_dirty();
        Ok(outcome)
    }

    /// Decode a table entry, skipping (and logging) anything malformed
    fn decode(&self, id: &str, value: &Value) -> Option<DatasetRecord> {
        match DatasetRecord::deserialize(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "[{}] Skipping malformed {} entry '{}': {}",
                    self.workspace, self.namespace, id, e
                );
                None
            }
        }
    }

    fn decoded<'a>(&'a self, table: &'a Table) -> impl Iterator<Item = (&'a String, DatasetRecord)> {
        table
            .iter()
            .filter_map(|(id, value)| self.decode(id, value).map(|record| (id, record)))
    }

    /// Apply `patch` to the `docs` list of a stored dataset under the lock.
    ///
    /// Every other key of the stored object is left untouched. Returns true
    /// if the dataset existed and `patch` reported a change.
    async fn patch_docs(
        &self,
        id: &str,
        patch: impl FnOnce(&mut Vec<String>) -> bool + Send,
    ) -> Result<bool> {
        let attached = self.attached()?;
        {
            let mut table = attached.shared.lock().await;
            let Some(Value::Object(dataset)) = table.get_mut(id) else {
                return Ok(false);
            };
            let mut docs = match dataset.get("docs") {
                None | Some(Value::Null) => Vec::new(),
                Some(value) => match Vec::<String>::deserialize(value) {
                    Ok(docs) => docs,
                    Err(e) => {
                        warn!(
                            "[{}] Skipping malformed docs of '{}': {}",
                            attached.shared.key(),
                            id,
                            e
                        );
                        return Ok(false);
                    }
                },
            };
            if !patch(&mut docs) {
                return Ok(false);
            }
            dataset.insert("docs".to_string(), Value::from(docs));
            attached.shared.broadcast_dirty();
        }
        self.flush().await?;
        Ok(true)
    }

    async fn clear_all(&self) -> Result<()> {
        let attached = self.attached()?;
        {
            let mut table = attached.shared.lock().await;
            table.clear();
            attached.shared.broadcast_dirty();
        }
        self.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl DatasetStorage for JsonDatasetStorage {
    async fn initialize(&self) -> Result<()> {
        self.attached
            .get_or_try_init(|| async {
                let shared = self.registry.namespace(&self.namespace, &self.workspace);
                let storage_updated = shared.register_flag();

                let _gate = self.registry.init_gate().lock().await;
                if self
                    .registry
                    .try_initialize(&self.namespace, &self.workspace)
                {
                    let loaded = snapshot::load(&self.file_name).await;
                    let records = loaded.len();
                    shared.lock().await.extend(loaded.table.unwrap_or_default());
                    shared.set_digest(loaded.digest);
                    info!(
                        "[{}] Process {} dataset metadata load {} with {} records",
                        self.workspace,
                        std::process::id(),
                        self.namespace,
                        records
                    );
                }

                Ok::<_, Error>(Attached {
                    shared,
                    storage_updated,
                })
            })
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Value>> {
        let table = self.attached()?.shared.lock().await;
        Ok(table.get(id).cloned())
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Value>> {
        let table = self.attached()?.shared.lock().await;
        Ok(ids.iter().filter_map(|id| table.get(id).cloned()).collect())
    }

    async fn filter_keys(&self, keys: HashSet<String>) -> Result<HashSet<String>> {
        let table = self.attached()?.shared.lock().await;
        Ok(keys.into_iter().filter(|k| !table.contains_key(k)).collect())
    }

    async fn upsert(&self, data: BTreeMap<String, Value>) -> Result<()> {
        let attached = self.attached()?;
        {
            let mut table = attached.shared.lock().await;
            table.extend(data);
            attached.shared.broadcast_dirty();
        }
        self.flush().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let attached = self.attached()?;
        {
            let mut table = attached.shared.lock().await;
            for id in ids {
                table.remove(id);
            }
            attached.shared.broadcast_dirty();
        }
        self.flush().await?;
        Ok(())
    }

    async fn get_dataset(&self, id: &str) -> Result<Option<DatasetRecord>> {
        let table = self.attached()?.shared.lock().await;
        Ok(table.get(id).and_then(|v| self.decode(id, v)))
    }

    async fn get_dataset_by_exact_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        let table = self.attached()?.shared.lock().await;
        let wanted = name.to_lowercase();
        Ok(self
            .decoded(&table)
            .find(|(_, record)| record.name.to_lowercase() == wanted)
            .map(|(_, record)| record))
    }

    async fn search_datasets_by_name(
        &self,
        keyword: &str,
    ) -> Result<BTreeMap<String, DatasetRecord>> {
        let table = self.attached()?.shared.lock().await;
        let keyword = keyword.to_lowercase();
        Ok(self
            .decoded(&table)
            .filter(|(_, record)| record.name.to_lowercase().contains(&keyword))
            .map(|(id, record)| (id.clone(), record))
            .collect())
    }

    async fn get_datasets_paginated(
        &self,
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Result<PageRows> {
        let query = PageQuery::new(page, page_size, sort_field, sort_direction, &self.pagination);
        let rows: Vec<(String, DatasetRecord)> = {
            let table = self.attached()?.shared.lock().await;
            self.decoded(&table)
                .map(|(id, record)| (id.clone(), record))
                .collect()
        };
        Ok(paginate(rows, &query, self.collator.as_ref()))
    }

    async fn create_or_update_dataset(&self, id: &str, record: DatasetRecord) -> Result<()> {
        let attached = self.attached()?;
        let value = serde_json::to_value(&record)?;
        {
            let mut table = attached.shared.lock().await;
            table.insert(id.to_string(), value);
            attached.shared.broadcast_dirty();
        }
        self.flush().await?;
        Ok(())
    }

    async fn delete_dataset(&self, id: &str) -> Result<()> {
        let attached = self.attached()?;
        let existed = {
            let mut table = attached.shared.lock().await;
            let existed = table.remove(id).is_some();
            if existed {
                attached.shared.broadcast_dirty();
            }
            existed
        };
        if existed {
            self.flush().await?;
        }
        Ok(())
    }

    async fn add_doc_to_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        self.patch_docs(id, |docs| {
            if docs.iter().any(|d| d == doc_id) {
                return false;
            }
            docs.push(doc_id.to_string());
            true
        })
        .await?;
        Ok(())
    }

    async fn remove_doc_from_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        self.patch_docs(id, |docs| {
            let before = docs.len();
            docs.retain(|d| d != doc_id);
            docs.len() != before
        })
        .await?;
        Ok(())
    }

    async fn index_done_callback(&self) -> Result<()> {
        self.flush().await?;
        Ok(())
    }

    async fn is_empty(&self) -> Result<bool> {
        let table = self.attached()?.shared.lock().await;
        Ok(table.is_empty())
    }

    async fn drop_all(&self) -> DropResult {
        match self.clear_all().await {
            Ok(()) => {
                info!(
                    "[{}] Process {} drop {}",
                    self.workspace,
                    std::process::id(),
                    self.namespace
                );
                DropResult::success()
            }
            Err(e) => {
                error!("[{}] Error dropping {}: {}", self.workspace, self.namespace, e);
                DropResult::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collate::TransliterationCollator;
    use dsmeta_common::OpStatus;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.working_dir = dir.path().to_path_buf();
        config
    }

    async fn open(dir: &TempDir) -> JsonDatasetStorage {
        let store = JsonDatasetStorage::new(&config(dir), Arc::new(SharedRegistry::new())).unwrap();
        store.initialize().await.unwrap();
        store
    }

    fn named(name: &str) -> DatasetRecord {
        DatasetRecord::new(name, "")
    }

    fn on_disk(store: &JsonDatasetStorage) -> Value {
        serde_json::from_slice(&std::fs::read(store.file_name()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_every_operation_requires_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDatasetStorage::new(&config(&dir), Arc::new(SharedRegistry::new())).unwrap();

        let not_init = |r: Result<()>| matches!(r, Err(Error::StorageNotInitialized(_)));
        assert!(not_init(store.get_by_id("x").await.map(|_| ())));
        assert!(not_init(store.get_by_ids(&["x".into()]).await.map(|_| ())));
        assert!(not_init(store.filter_keys(HashSet::new()).await.map(|_| ())));
        assert!(not_init(store.upsert(BTreeMap::new()).await));
        assert!(not_init(store.delete(&["x".into()]).await));
        assert!(not_init(store.get_dataset("x").await.map(|_| ())));
        assert!(not_init(store.get_dataset_by_exact_name("x").await.map(|_| ())));
        assert!(not_init(store.search_datasets_by_name("x").await.map(|_| ())));
        assert!(not_init(
            store
                .get_datasets_paginated(1, 10, SortField::Name, SortDirection::Asc)
                .await
                .map(|_| ())
        ));
        assert!(not_init(store.create_or_update_dataset("x", named("n")).await));
        assert!(not_init(store.delete_dataset("x").await));
        assert!(not_init(store.add_doc_to_dataset("x", "d").await));
        assert!(not_init(store.remove_doc_from_dataset("x", "d").await));
        assert!(not_init(store.index_done_callback().await));
        assert!(not_init(store.is_empty().await.map(|_| ())));
        assert_eq!(store.drop_all().await.status, OpStatus::Error);
    }

    #[tokio::test]
    async fn test_create_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;

        store.create_or_update_dataset("x", named("n")).await.unwrap();
        let record = store.get_dataset("x").await.unwrap().unwrap();
        assert_eq!(record, named("n"));
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"name": "n", "description": "", "created_at": "", "updated_at": "", "docs": []})
        );
        assert_eq!(on_disk(&store)["x"]["name"], "n");
    }

    #[tokio::test]
    async fn test_partial_upsert_reads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;

        store
            .upsert(BTreeMap::from([("x".to_string(), json!({"name": "n"}))]))
            .await
            .unwrap();
        assert_eq!(store.get_by_id("x").await.unwrap(), Some(json!({"name": "n"})));
        assert_eq!(store.get_dataset("x").await.unwrap(), Some(named("n")));
    }

    #[tokio::test]
    async fn test_generic_kv_accessors() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store
            .upsert(BTreeMap::from([
                ("a".to_string(), json!({"name": "a"})),
                ("b".to_string(), json!({"name": "b"})),
            ]))
            .await
            .unwrap();

        let got = store
            .get_by_ids(&["b".into(), "missing".into(), "a".into()])
            .await
            .unwrap();
        assert_eq!(got, vec![json!({"name": "b"}), json!({"name": "a"})]);

        let missing = store
            .filter_keys(HashSet::from(["a".to_string(), "z".to_string()]))
            .await
            .unwrap();
        assert_eq!(missing, HashSet::from(["z".to_string()]));

        store.delete(&["a".into(), "nope".into()]).await.unwrap();
        assert_eq!(store.get_by_id("a").await.unwrap(), None);
        assert!(store.get_by_id("b").await.unwrap().is_some());
        assert!(on_disk(&store).get("a").is_none());
    }

    #[tokio::test]
    async fn test_exact_name_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("ds-1", named("acme")).await.unwrap();

        assert!(store.get_dataset_by_exact_name("Acme").await.unwrap().is_some());
        assert!(store.get_dataset_by_exact_name("ACME").await.unwrap().is_some());
        assert!(store.get_dataset_by_exact_name("acm").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_exact_name_duplicates_pick_lowest_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        let mut later = named("ACME");
        later.description = "second".into();
        store.create_or_update_dataset("ds-b", later).await.unwrap();
        let mut first = named("acme");
        first.description = "first".into();
        store.create_or_update_dataset("ds-a", first).await.unwrap();

        let found = store.get_dataset_by_exact_name("Acme").await.unwrap().unwrap();
        assert_eq!(found.description, "first");
    }

    #[tokio::test]
    async fn test_search_by_substring() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        for (id, name) in [("1", "Acme"), ("2", "Track"), ("3", "beta")] {
            store.create_or_update_dataset(id, named(name)).await.unwrap();
        }

        let hits = store.search_datasets_by_name("ac").await.unwrap();
        assert_eq!(hits.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert!(store.search_datasets_by_name("zzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paginated_by_name_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("C", named("crew")).await.unwrap();
        store.create_or_update_dataset("A", named("acme")).await.unwrap();
        store.create_or_update_dataset("B", named("beta")).await.unwrap();

        let (rows, total) = store
            .get_datasets_paginated(1, 10, SortField::Name, SortDirection::Asc)
            .await
            .unwrap();
        assert_eq!(total, 3);
        let ids: Vec<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_paginated_with_transliteration() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir)
            .await
            .with_collator(Arc::new(TransliterationCollator));
        store.create_or_update_dataset("1", named("zebra")).await.unwrap();
        store.create_or_update_dataset("2", named("北京")).await.unwrap();
        store.create_or_update_dataset("3", named("apple")).await.unwrap();

        let (rows, _) = store
            .get_datasets_paginated(0, 0, SortField::Name, SortDirection::Asc)
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_add_doc_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("x", named("n")).await.unwrap();

        store.add_doc_to_dataset("x", "d1").await.unwrap();
        store.add_doc_to_dataset("x", "d1").await.unwrap();
        assert_eq!(store.get_dataset("x").await.unwrap().unwrap().docs, vec!["d1"]);
        assert_eq!(on_disk(&store)["x"]["docs"], json!(["d1"]));

        // Unknown dataset is a no-op
        store.add_doc_to_dataset("missing", "d1").await.unwrap();
        assert!(store.get_dataset("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_doc_does_not_flush() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("x", named("n")).await.unwrap();
        store.add_doc_to_dataset("x", "d1").await.unwrap();
        let before = std::fs::read(store.file_name()).unwrap();

        // An external edit would be overwritten by any flush
        std::fs::write(store.file_name(), b"{}").unwrap();
        store.remove_doc_from_dataset("x", "missing").await.unwrap();
        store.remove_doc_from_dataset("nope", "d1").await.unwrap();
        assert_eq!(std::fs::read(store.file_name()).unwrap(), b"{}");
        assert!(!store.has_pending_flush());

        std::fs::write(store.file_name(), &before).unwrap();
        store.remove_doc_from_dataset("x", "d1").await.unwrap();
        assert!(store.get_dataset("x").await.unwrap().unwrap().docs.is_empty());
        assert_eq!(on_disk(&store)["x"]["docs"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("x", named("n")).await.unwrap();

        store.delete_dataset("missing").await.unwrap();
        assert!(!store.is_empty().await.unwrap());

        store.delete_dataset("x").await.unwrap();
        assert!(store.is_empty().await.unwrap());
        assert_eq!(on_disk(&store), json!({}));
    }

    #[tokio::test]
    async fn test_flush_skipped_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        assert_eq!(store.flush().await.unwrap(), FlushOutcome::Skipped);
        assert!(!store.file_name().exists());

        store.create_or_update_dataset("x", named("n")).await.unwrap();
        assert!(!store.has_pending_flush());
        assert_eq!(store.flush().await.unwrap(), FlushOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_external_modification_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("x", named("n")).await.unwrap();

        std::fs::write(store.file_name(), br#"{"other": {"name": "o"}}"#).unwrap();
        store.attached().unwrap().shared.broadcast_dirty();
        assert_eq!(store.flush().await.unwrap(), FlushOutcome::Reloaded);

        // Written content wins over the external edit and is now the baseline
        assert_eq!(on_disk(&store)["x"]["name"], "n");
        store.attached().unwrap().shared.broadcast_dirty();
        assert_eq!(store.flush().await.unwrap(), FlushOutcome::Written);
    }

    #[tokio::test]
    async fn test_load_existing_and_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kv_store_dataset.json"),
            br#"{"ds-1": {"name": "acme", "docs": ["d1"]}}"#,
        )
        .unwrap();
        let store = open(&dir).await;
        assert_eq!(store.get_dataset("ds-1").await.unwrap().unwrap().docs, vec!["d1"]);

        let corrupt = tempfile::tempdir().unwrap();
        std::fs::write(corrupt.path().join("kv_store_dataset.json"), b"garbage").unwrap();
        let store = open(&corrupt).await;
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_workspace_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.storage.workspace = "tenant".into();
        let store = JsonDatasetStorage::new(&config, Arc::new(SharedRegistry::new())).unwrap();
        assert!(dir.path().join("tenant").is_dir());
        assert_eq!(
            store.file_name(),
            dir.path().join("tenant").join("kv_store_dataset.json")
        );
    }

    #[tokio::test]
    async fn test_drop_success() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store.create_or_update_dataset("a", named("acme")).await.unwrap();
        store.create_or_update_dataset("b", named("beta")).await.unwrap();

        let result = store.drop_all().await;
        assert!(result.is_success());
        assert!(store.is_empty().await.unwrap());
        assert_eq!(on_disk(&store), json!({}));
    }

    #[tokio::test]
    async fn test_drop_reports_disk_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store
            .upsert(BTreeMap::from([("a".to_string(), json!({"name": "acme"}))]))
            .await
            .unwrap();

        std::fs::remove_file(store.file_name()).unwrap();
        std::fs::create_dir(store.file_name()).unwrap();

        let result = store.drop_all().await;
        assert_eq!(result.status, OpStatus::Error);
        assert!(!result.message.is_empty());
        assert!(store.has_pending_flush());
    }

    #[tokio::test]
    async fn test_mutation_propagates_flush_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        std::fs::create_dir(store.file_name()).unwrap();

        let err = store
            .create_or_update_dataset("x", named("n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        // The mutation itself was applied
        assert!(store.get_dataset("x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_doc_changes_keep_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir).await;
        store
            .upsert(BTreeMap::from([(
                "x".to_string(),
                json!({"name": "n", "owner": "alice"}),
            )]))
            .await
            .unwrap();

        store.add_doc_to_dataset("x", "d1").await.unwrap();
        let expected = json!({"name": "n", "owner": "alice", "docs": ["d1"]});
        assert_eq!(store.get_by_id("x").await.unwrap(), Some(expected.clone()));
        assert_eq!(on_disk(&store)["x"], expected);

        store.remove_doc_from_dataset("x", "d1").await.unwrap();
        assert_eq!(
            store.get_by_id("x").await.unwrap(),
            Some(json!({"name": "n", "owner": "alice", "docs": []}))
        );
    }

    #[tokio::test]
    async fn test_flush_after_peer_flush_is_not_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SharedRegistry::new());
        let a = JsonDatasetStorage::new(&config(&dir), Arc::clone(&registry)).unwrap();
        let b = JsonDatasetStorage::new(&config(&dir), registry).unwrap();
        a.initialize().await.unwrap();
        b.initialize().await.unwrap();

        a.create_or_update_dataset("x", named("n")).await.unwrap();
        b.attached().unwrap().shared.broadcast_dirty();
        assert_eq!(b.flush().await.unwrap(), FlushOutcome::Written);

        std::fs::write(b.file_name(), b"{}").unwrap();
        a.attached().unwrap().shared.broadcast_dirty();
        assert_eq!(a.flush().await.unwrap(), FlushOutcome::Reloaded);
    }
}
