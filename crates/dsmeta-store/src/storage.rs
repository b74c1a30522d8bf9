//! Dataset storage interface
//!
//! Implemented by the persistent JSON store and by the lazily-initializing
//! proxy that wraps it.

use async_trait::async_trait;
use dsmeta_common::{DatasetRecord, DropResult, Result, SortDirection, SortField};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// One page of a listing: rows in order, plus the unpaginated row count
pub type PageRows = (Vec<(String, DatasetRecord)>, usize);

/// Operations on one namespace of dataset metadata
///
/// Every operation other than `initialize` fails with
/// `Error::StorageNotInitialized` until `initialize` has completed.
#[async_trait]
pub trait DatasetStorage: Send + Sync {
    /// Attach to the shared namespace, seeding it from disk if first
    async fn initialize(&self) -> Result<()>;

    // ---- Generic key-value access ----

    /// Raw value stored under `id`
    async fn get_by_id(&self, id: &str) -> Result<Option<Value>>;

    /// Raw values for the ids that exist, in request order
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Value>>;

    /// The subset of `keys` not present in the table
    async fn filter_keys(&self, keys: HashSet<String>) -> Result<HashSet<String>>;

    /// Merge `data` into the table, overwriting existing ids
    async fn upsert(&self, data: BTreeMap<String, Value>) -> Result<()>;

    /// Remove `ids`; absent ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;

    // ---- Dataset access ----

    async fn get_dataset(&self, id: &str) -> Result<Option<DatasetRecord>>;

    /// Case-insensitive full-name match; the lowest id wins on duplicates
    async fn get_dataset_by_exact_name(&self, name: &str) -> Result<Option<DatasetRecord>>;

    /// Case-insensitive substring match on the name
    async fn search_datasets_by_name(
        &self,
        keyword: &str,
    ) -> Result<BTreeMap<String, DatasetRecord>>;

    async fn get_datasets_paginated(
        &self,
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Result<PageRows>;

    async fn create_or_update_dataset(&self, id: &str, record: DatasetRecord) -> Result<()>;

    async fn delete_dataset(&self, id: &str) -> Result<()>;

    // ---- Document membership ----

    async fn add_doc_to_dataset(&self, id: &str, doc_id: &str) -> Result<()>;

    async fn remove_doc_from_dataset(&self, id: &str, doc_id: &str) -> Result<()>;

    // ---- Lifecycle ----

    /// Flush the table to disk if a mutation is pending
    async fn index_done_callback(&self) -> Result<()>;

    async fn is_empty(&self) -> Result<bool>;

    /// Remove every record; failures are reported in the result
    async fn drop_all(&self) -> DropResult;
}
