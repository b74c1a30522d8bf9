//! Deferred storage initialization
//!
//! [`LazyStorage`] owns a storage and forwards every operation to it,
//! running the storage's `initialize()` before the first forwarded call.
//! The initialized check happens under an async mutex, so concurrent first
//! calls initialize once.

use crate::storage::{DatasetStorage, PageRows};
use async_trait::async_trait;
use dsmeta_common::{DatasetRecord, DropResult, Result, SortDirection, SortField};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

/// Storage wrapper that initializes its inner storage on first use
pub struct LazyStorage<S> {
    inner: S,
    initialized: Mutex<bool>,
}

impl<S: DatasetStorage> LazyStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            initialized: Mutex::new(false),
        }
    }

    /// The wrapped storage
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Whether the inner storage has been initialized through this proxy
    pub async fn is_initialized(&self) -> bool {
        *self.initialized.lock().await
    }

    /// Initialize the inner storage unless already done.
    ///
    /// A failed initialization leaves the proxy uninitialized; the next
    /// call tries again.
    pub async fn ensure_initialized(&self) -> Result<()> {
        let mut initialized = self.initialized.lock().await;
        if !*initialized {
            debug!("Initializing storage on first use");
            self.inner.initialize().await?;
            *initialized = true;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DatasetStorage> DatasetStorage for LazyStorage<S> {
    async fn initialize(&self) -> Result<()> {
        self.ensure_initialized().await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Value>> {
        self.ensure_initialized().await?;
        self.inner.get_by_id(id).await
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Value>> {
        self.ensure_initialized().await?;
        self.inner.get_by_ids(ids).await
    }

    async fn filter_keys(&self, keys: HashSet<String>) -> Result<HashSet<String>> {
        self.ensure_initialized().await?;
        self.inner.filter_keys(keys).await
    }

    async fn upsert(&self, data: BTreeMap<String, Value>) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.upsert(data).await
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.delete(ids).await
    }

    async fn get_dataset(&self, id: &str) -> Result<Option<DatasetRecord>> {
        self.ensure_initialized().await?;
        self.inner.get_dataset(id).await
    }

    async fn get_dataset_by_exact_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        self.ensure_initialized().await?;
        self.inner.get_dataset_by_exact_name(name).await
    }

    async fn search_datasets_by_name(
        &self,
        keyword: &str,
    ) -> Result<BTreeMap<String, DatasetRecord>> {
        self.ensure_initialized().await?;
        self.inner.search_datasets_by_name(keyword).await
    }

    async fn get_datasets_paginated(
        &self,
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Result<PageRows> {
        self.ensure_initialized().await?;
        self.inner
            .get_datasets_paginated(page, page_size, sort_field, sort_direction)
            .await
    }

    async fn create_or_update_dataset(&self, id: &str, record: DatasetRecord) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.create_or_update_dataset(id, record).await
    }

    async fn delete_dataset(&self, id: &str) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.delete_dataset(id).await
    }

    async fn add_doc_to_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.add_doc_to_dataset(id, doc_id).await
    }

    async fn remove_doc_from_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.remove_doc_from_dataset(id, doc_id).await
    }

    async fn index_done_callback(&self) -> Result<()> {
        self.ensure_initialized().await?;
        self.inner.index_done_callback().await
    }

    async fn is_empty(&self) -> Result<bool> {
        self.ensure_initialized().await?;
        self.inner.is_empty().await
    }

    async fn drop_all(&self) -> DropResult {
        if let Err(e) = self.ensure_initialized().await {
            return DropResult::error(e.to_string());
        }
        self.inner.drop_all().await
    }
}
