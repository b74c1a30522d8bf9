//! dsmeta Store - Namespaced dataset metadata storage
//!
//! Dataset records live in per-namespace tables held by a
//! [`SharedRegistry`]. Every store attached to the same namespace sees the
//! same table, and one store's flush persists the table as a JSON snapshot
//! for all of them. [`DatasetManager`] layers a worker-local cache and
//! name-checked create/update over a lazily initialized store.

pub mod collate;
pub mod json;
pub mod lazy;
pub mod manager;
pub mod page;
pub mod registry;
pub mod snapshot;
pub mod storage;

pub use collate::{CodePointCollator, NameCollator, TransliterationCollator, collator_for};
pub use json::{FlushOutcome, JsonDatasetStorage};
pub use lazy::LazyStorage;
pub use manager::{CreateOutcome, DatasetManager, DatasetPage, DatasetSummary, UpdateOutcome};
pub use registry::{NamespaceKey, NamespaceShared, SharedRegistry, Table};
pub use storage::{DatasetStorage, PageRows};
