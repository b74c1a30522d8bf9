//! JSON snapshot files
//!
//! A snapshot is one JSON object mapping record id to record body. Loads
//! never fail: a missing or unreadable file yields no table. Writes go to a
//! sibling temp file that is then renamed over the snapshot.

use crate::registry::Table;
use dsmeta_common::{ContentDigest, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What a load observed on disk
#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    /// Decoded table; `None` when the file is missing or corrupt
    pub table: Option<Table>,
    /// Digest of the bytes read; `None` when nothing could be read
    pub digest: Option<ContentDigest>,
}

impl LoadedSnapshot {
    /// Number of records loaded
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.as_ref().map_or(0, Table::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load a snapshot, degrading to an empty result on any failure
pub async fn load(path: &Path) -> LoadedSnapshot {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return LoadedSnapshot::default(),
        Err(e) => {
            warn!("Failed to read snapshot {}: {}", path.display(), e);
            return LoadedSnapshot::default();
        }
    };

    let digest = Some(ContentDigest::compute(&bytes));
    match serde_json::from_slice::<Table>(&bytes) {
        Ok(table) => LoadedSnapshot {
            table: Some(table),
            digest,
        },
        Err(e) => {
            warn!("Ignoring corrupt snapshot {}: {}", path.display(), e);
            LoadedSnapshot { table: None, digest }
        }
    }
}

/// Digest of the snapshot currently on disk, `None` if there is no file
pub async fn read_digest(path: &Path) -> Result<Option<ContentDigest>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(ContentDigest::compute(&bytes))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `table` as the snapshot at `path`, returning the written digest
pub async fn write(path: &Path, table: &Table) -> Result<ContentDigest> {
    let bytes = serde_json::to_vec_pretty(table)?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, &bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(ContentDigest::compute(&bytes))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
