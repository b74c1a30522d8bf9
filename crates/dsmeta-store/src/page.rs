//! Sorting and slicing for paginated dataset listings

use crate::collate::NameCollator;
use dsmeta_common::config::PaginationConfig;
use dsmeta_common::{DatasetRecord, SortDirection, SortField};

/// A listing request with its bounds already applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
}

impl PageQuery {
    /// Clamp `page` to at least 1 and `page_size` into the configured bounds
    #[must_use]
    pub fn new(
        page: usize,
        page_size: usize,
        sort_field: SortField,
        sort_direction: SortDirection,
        limits: &PaginationConfig,
    ) -> Self {
        Self {
            page: page.max(1),
            page_size: limits.clamp_page_size(page_size),
            sort_field,
            sort_direction,
        }
    }

    /// Index of the first row on this page
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// Sort `rows` (given in table order) and cut out the requested page.
///
/// Returns the page and the number of rows before slicing. The sort is
/// stable in both directions, so equal keys keep table order.
pub fn paginate(
    rows: Vec<(String, DatasetRecord)>,
    query: &PageQuery,
    collator: &dyn NameCollator,
) -> (Vec<(String, DatasetRecord)>, usize) {
    let mut keyed: Vec<(String, (String, DatasetRecord))> = rows
        .into_iter()
        .map(|(id, record)| (sort_key(&id, &record, query.sort_field, collator), (id, record)))
        .collect();

    match query.sort_direction {
        SortDirection::Asc => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortDirection::Desc => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }

    let total = keyed.len();
    let page = keyed
        .into_iter()
        .skip(query.offset())
        .take(query.page_size)
        .map(|(_, row)| row)
        .collect();
    (page, total)
}

fn sort_key(
    id: &str,
    record: &DatasetRecord,
    field: SortField,
    collator: &dyn NameCollator,
) -> String {
    match field {
        SortField::Name => collator.sort_key(&record.name),
        SortField::Id => id.to_string(),
        SortField::CreatedAt => record.created_at.clone(),
        SortField::UpdatedAt => record.updated_at.clone(),
    }
}
