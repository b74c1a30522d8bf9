//! Core type definitions for dsmeta
//!
//! This module defines the dataset metadata record, the sort and
//! pagination parameters understood by the store, and the structured
//! results returned by operations that never fail.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata for one dataset
///
/// The dataset id is not part of the record: it is the key under which the
/// record is stored, both in the shared table and in the snapshot file.
/// Every field defaults when absent so partially written entries still
/// decode.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetRecord {
    /// Display name (callers keep it unique; the store does not)
    pub name: String,
    /// Free-form description
    pub description: String,
    /// ISO-8601 creation timestamp, set once
    pub created_at: String,
    /// ISO-8601 timestamp of the last update, supplied by callers
    pub updated_at: String,
    /// Member document ids, insertion ordered, no duplicates
    pub docs: Vec<String>,
}

impl DatasetRecord {
    /// Create a record with no documents
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Set both timestamps to `now`
    #[must_use]
    pub fn stamped(mut self, now: impl Into<String>) -> Self {
        let now = now.into();
        self.created_at.clone_from(&now);
        self.updated_at = now;
        self
    }

    /// Check whether `doc_id` is a member
    #[must_use]
    pub fn contains_doc(&self, doc_id: &str) -> bool {
        self.docs.iter().any(|d| d == doc_id)
    }

    /// Append `doc_id` unless already present. Returns true if added.
    pub fn add_doc(&mut self, doc_id: &str) -> bool {
        if self.contains_doc(doc_id) {
            return false;
        }
        self.docs.push(doc_id.to_string());
        true
    }

    /// Remove `doc_id` if present. Returns true if removed.
    pub fn remove_doc(&mut self, doc_id: &str) -> bool {
        let before = self.docs.len();
        self.docs.retain(|d| d != doc_id);
        self.docs.len() != before
    }

    /// Number of member documents
    #[must_use]
    pub fn docs_count(&self) -> usize {
        self.docs.len()
    }
}

/// Field a paginated listing is sorted by
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    CreatedAt,
    #[default]
    UpdatedAt,
    Name,
    Id,
}

impl SortField {
    /// Parse a field name, falling back to `updated_at` for anything unknown
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            "name" => Self::Name,
            "id" => Self::Id,
            _ => Self::default(),
        }
    }

    /// Wire name of this field
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Id => "id",
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction of a paginated listing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parse a direction; anything other than `asc` (any case) is descending
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        if s.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination summary for one page of a listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationInfo {
    /// Build the summary for `page` (1-based) of `total_count` rows
    #[must_use]
    pub fn new(page: usize, page_size: usize, total_count: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size)
        };
        Self {
            page,
            page_size,
            total_count,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Outcome status of a structured-result operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpStatus {
    Success,
    Error,
}

/// Result of dropping a namespace; never raised as an error
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropResult {
    pub status: OpStatus,
    pub message: String,
}

impl DropResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: OpStatus::Success,
            message: "data dropped".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OpStatus::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == OpStatus::Success
    }
}
