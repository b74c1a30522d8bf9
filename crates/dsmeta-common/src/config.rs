//! Configuration types for dsmeta
//!
//! Configuration is read from an optional file (any format the `config`
//! crate understands) layered under `DSMETA__`-prefixed environment
//! variables, e.g. `DSMETA__STORAGE__WORKING_DIR=/data`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DSMETA";

/// Root configuration for dsmeta
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage location configuration
    pub storage: StorageConfig,
    /// Sort configuration
    pub sort: SortConfig,
    /// Pagination limits
    pub pagination: PaginationConfig,
}

impl Config {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Where the snapshot files live
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for all snapshot files
    pub working_dir: PathBuf,
    /// Tenant scope; empty means the working directory itself
    pub workspace: String,
    /// Namespace of the dataset table
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from("./rag_storage"),
            workspace: String::new(),
            namespace: "dataset".to_string(),
        }
    }
}

impl StorageConfig {
    /// Directory holding this workspace's snapshot files
    #[must_use]
    pub fn workspace_dir(&self) -> PathBuf {
        if self.workspace.is_empty() {
            self.working_dir.clone()
        } else {
            self.working_dir.join(&self.workspace)
        }
    }

    /// Snapshot file for `namespace` in this workspace
    #[must_use]
    pub fn snapshot_path(&self, namespace: &str) -> PathBuf {
        self.workspace_dir()
            .join(format!("kv_store_{namespace}.json"))
    }
}

/// How dataset names are compared when sorting by name
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCollation {
    /// Plain code-point order
    #[default]
    CodePoint,
    /// Transliterate to ASCII first (phonetic order for non-Latin scripts)
    Transliterate,
}

/// Sort configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub name_collation: NameCollation,
}

/// Pagination limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size used when the caller does not pick one
    pub default_page_size: usize,
    /// Smallest page size; smaller requests are raised to it
    pub min_page_size: usize,
    /// Largest page size; larger requests are lowered to it
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            min_page_size: 10,
            max_page_size: 200,
        }
    }
}

impl PaginationConfig {
    /// Clamp a requested page size into `[min_page_size, max_page_size]`
    #[must_use]
    pub fn clamp_page_size(&self, page_size: usize) -> usize {
        page_size.clamp(self.min_page_size, self.max_page_size.max(self.min_page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.namespace, "dataset");
        assert_eq!(config.storage.workspace, "");
        assert_eq!(config.sort.name_collation, NameCollation::CodePoint);
        assert_eq!(config.pagination.default_page_size, 50);
    }

    #[test]
    fn test_snapshot_path() {
        let mut storage = StorageConfig {
            working_dir: PathBuf::from("/data"),
            ..StorageConfig::default()
        };
        assert_eq!(
            storage.snapshot_path("dataset"),
            PathBuf::from("/data/kv_store_dataset.json")
        );

        storage.workspace = "tenant-a".to_string();
        assert_eq!(
            storage.snapshot_path("dataset"),
            PathBuf::from("/data/tenant-a/kv_store_dataset.json")
        );
    }

    #[test]
    fn test_clamp_page_size() {
        let pagination = PaginationConfig::default();
        assert_eq!(pagination.clamp_page_size(0), 10);
        assert_eq!(pagination.clamp_page_size(9), 10);
        assert_eq!(pagination.clamp_page_size(10), 10);
        assert_eq!(pagination.clamp_page_size(75), 75);
        assert_eq!(pagination.clamp_page_size(200), 200);
        assert_eq!(pagination.clamp_page_size(5000), 200);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[storage]\nworking_dir = \"/srv/meta\"\nworkspace = \"w1\"\n\n[sort]\nname_collation = \"transliterate\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.storage.working_dir, PathBuf::from("/srv/meta"));
        assert_eq!(config.storage.workspace, "w1");
        assert_eq!(config.storage.namespace, "dataset");
        assert_eq!(config.sort.name_collation, NameCollation::Transliterate);
        assert_eq!(config.pagination, PaginationConfig::default());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/dsmeta.toml"))).unwrap();
        assert_eq!(config.storage, StorageConfig::default());
    }
}
