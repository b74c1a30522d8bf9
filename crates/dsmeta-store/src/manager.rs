//! Dataset manager: the domain-facing API over dataset storage
//!
//! The manager keeps a worker-local, id-keyed cache of datasets. Reads by
//! id go through the cache; writes go to storage first and then update the
//! cache. A failed write drops the affected cache entries. Nothing
//! invalidates the cache when another worker changes the same dataset, so a
//! cached entry can be stale until [`DatasetManager::invalidate`] or
//! [`DatasetManager::clear_cache`] is called.

use crate::json::JsonDatasetStorage;
use crate::lazy::LazyStorage;
use crate::registry::SharedRegistry;
use crate::storage::{DatasetStorage, PageRows};
use dsmeta_common::config::{Config, PaginationConfig};
use dsmeta_common::{
    DatasetRecord, DropResult, PaginationInfo, Result, SortDirection, SortField,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix of generated dataset ids
pub const DATASET_ID_PREFIX: &str = "dataset-";

/// Result of [`DatasetManager::create_dataset`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created { id: String },
    /// A dataset with the normalized name already exists
    Duplicated { name: String },
}

/// Result of [`DatasetManager::update_dataset`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    /// The new name belongs to another dataset
    Duplicated { name: String },
}

/// A dataset as presented in listings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub docs_count: usize,
    pub docs: Vec<String>,
}

impl DatasetSummary {
    #[must_use]
    pub fn new(id: String, record: DatasetRecord) -> Self {
        Self {
            id,
            docs_count: record.docs_count(),
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            docs: record.docs,
        }
    }
}

/// One page of datasets with its pagination summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPage {
    pub datasets: Vec<DatasetSummary>,
    pub pagination: PaginationInfo,
}

/// Normalize a user-supplied dataset name
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Manages datasets and their document lists for one workspace
pub struct DatasetManager<S = JsonDatasetStorage> {
    workspace: String,
    storage: LazyStorage<S>,
    pagination: PaginationConfig,
    /// dataset id -> last known record
    cache: RwLock<HashMap<String, DatasetRecord>>,
}

impl DatasetManager<JsonDatasetStorage> {
    /// Build a manager over JSON storage for the configured workspace
    pub fn open(config: &Config, registry: Arc<SharedRegistry>) -> Result<Self> {
        let storage = JsonDatasetStorage::new(config, registry)?;
        Ok(Self::new(config.storage.workspace.clone(), storage)
            .with_pagination(config.pagination.clone()))
    }
}

impl<S: DatasetStorage> DatasetManager<S> {
    /// Wrap `storage`; it is initialized on first use
    pub fn new(workspace: impl Into<String>, storage: S) -> Self {
        Self {
            workspace: workspace.into(),
            storage: LazyStorage::new(storage),
            pagination: PaginationConfig::default(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Pagination limits used by [`DatasetManager::list_page`]
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// The lazily initialized storage
    pub const fn storage(&self) -> &LazyStorage<S> {
        &self.storage
    }

    // =========== Cache ===========

    /// Number of cached datasets
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Drop the cached entry for `id`
    pub fn invalidate(&self, id: &str) {
        self.cache.write().remove(id);
    }

    /// Drop every cached entry
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    // =========== Dataset Operations ===========

    /// Create or replace the dataset stored under `id`
    pub async fn create_or_update_dataset(&self, id: &str, record: DatasetRecord) -> Result<()> {
        let result = self.storage.create_or_update_dataset(id, record.clone()).await;
        if result.is_ok() {
            self.cache.write().insert(id.to_string(), record);
        } else {
            self.invalidate(id);
        }
        result
    }

    /// Get a dataset by id, from the cache when possible
    pub async fn get_dataset(&self, id: &str) -> Result<Option<DatasetRecord>> {
        if let Some(record) = self.cache.read().get(id) {
            return Ok(Some(record.clone()));
        }

        let record = self.storage.get_dataset(id).await?;
        if let Some(record) = &record {
            self.cache.write().insert(id.to_string(), record.clone());
        }
        Ok(record)
    }

    /// Get a dataset by exact (case-insensitive) name
    pub async fn get_dataset_by_name(&self, name: &str) -> Result<Option<DatasetRecord>> {
        self.storage.get_dataset_by_exact_name(name).await
    }

    /// Like [`DatasetManager::get_dataset_by_name`], also returning the id.
    /// The lowest id wins when several datasets share the name.
    pub async fn find_dataset_by_name(
        &self,
        name: &str,
    ) -> Result<Option<(String, DatasetRecord)>> {
        let wanted = name.to_lowercase();
        Ok(self
            .storage
            .search_datasets_by_name(name)
            .await?
            .into_iter()
            .find(|(_, record)| record.name.to_lowercase() == wanted))
    }

    /// Find datasets whose name contains `keyword` (case-insensitive)
    pub async fn search_datasets_by_name(
        &self,
        keyword: &str,
    ) -> Result<BTreeMap<String, DatasetRecord>> {
        self.storage.search_datasets_by_name(keyword).await
    }

    /// One page of datasets with the unpaginated count
    pub async fn list_datasets_paginated(
        &self,
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Result<PageRows> {
        self.storage
            .get_datasets_paginated(page, page_size, sort_field, sort_direction)
            .await
    }

    /// One page of datasets as summaries, with pagination info
    pub async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Result<DatasetPage> {
        let page = page.max(1);
        let page_size = self.pagination.clamp_page_size(page_size);
        let (rows, total) = self
            .list_datasets_paginated(page, page_size, sort_field, sort_direction)
            .await?;
        Ok(DatasetPage {
            datasets: rows
                .into_iter()
                .map(|(id, record)| DatasetSummary::new(id, record))
                .collect(),
            pagination: PaginationInfo::new(page, page_size, total),
        })
    }

    /// Delete a dataset
    pub async fn delete_dataset(&self, id: &str) -> Result<()> {
        let result = self.storage.delete_dataset(id).await;
        self.invalidate(id);
        result
    }

    // =========== Document Membership ===========

    /// Add a document to a dataset
    pub async fn add_doc_to_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        let result = self.storage.add_doc_to_dataset(id, doc_id).await;
        if result.is_ok() {
            if let Some(record) = self.cache.write().get_mut(id) {
                record.add_doc(doc_id);
            }
        } else {
            self.invalidate(id);
        }
        result
    }

    /// Remove a document from a dataset
    pub async fn remove_doc_from_dataset(&self, id: &str, doc_id: &str) -> Result<()> {
        let result = self.storage.remove_doc_from_dataset(id, doc_id).await;
        if result.is_ok() {
            if let Some(record) = self.cache.write().get_mut(id) {
                record.remove_doc(doc_id);
            }
        } else {
            self.invalidate(id);
        }
        result
    }

    // =========== Name-checked Create / Update ===========

    /// Create a dataset under a fresh id unless the name is taken.
    ///
    /// The name is trimmed and lowercased before the check and stored in
    /// that form.
    pub async fn create_dataset(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<CreateOutcome> {
        let name = normalize_name(name);
        if self.get_dataset_by_name(&name).await?.is_some() {
            debug!("[{}] Dataset '{}' already exists", self.workspace, name);
            return Ok(CreateOutcome::Duplicated { name });
        }

        let id = format!("{DATASET_ID_PREFIX}{}", Uuid::new_v4().simple());
        let record = DatasetRecord::new(name.as_str(), description.unwrap_or_default())
            .stamped(now_iso());
        self.create_or_update_dataset(&id, record).await?;

        info!("[{}] Dataset '{}' created as {}", self.workspace, name, id);
        Ok(CreateOutcome::Created { id })
    }

    /// Rename and/or re-describe a dataset, keeping its creation time and
    /// documents
    pub async fn update_dataset(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<UpdateOutcome> {
        let Some(existing) = self.get_dataset(id).await? else {
            return Ok(UpdateOutcome::NotFound);
        };

        let name = normalize_name(name);
        if name != existing.name && self.get_dataset_by_name(&name).await?.is_some() {
            return Ok(UpdateOutcome::Duplicated { name });
        }

        let record = DatasetRecord {
            name,
            description: description.unwrap_or_default().to_string(),
            created_at: existing.created_at,
            updated_at: now_iso(),
            docs: existing.docs,
        };
        self.create_or_update_dataset(id, record).await?;
        Ok(UpdateOutcome::Updated)
    }

    /// Remove every dataset in the namespace
    ///
    /// The cache is cleared whatever the outcome.
    pub async fn drop_datasets(&self) -> DropResult {
        let result = self.storage.drop_all().await;
        self.clear_cache();
        result
    }
}
