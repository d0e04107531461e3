use rayon::prelude::*;
use tracing::trace;

use crate::domain::{CvaError, PagePolicy};
use crate::records::{FieldCatalog, Record, Value};

/// The set of fields currently rendered as columns. Order-preserving
/// subset of the field catalog; may be empty.
#[derive(Debug, Clone)]
pub struct VisibleFields {
    fields: Vec<String>,
}

impl VisibleFields {
    /// Start with every catalog field visible, in catalog order.
    pub fn all(catalog: &FieldCatalog) -> Self {
        VisibleFields {
            fields: catalog.names().map(str::to_string).collect(),
        }
    }

    pub fn none() -> Self {
        VisibleFields { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn names(&self) -> &[String] {
        &self.fields
    }

    /// Remove the field if visible, otherwise append it.
    pub fn toggle(&mut self, field: &str) {
        if let Some(pos) = self.fields.iter().position(|f| f == field) {
            self.fields.remove(pos);
        } else {
            self.fields.push(field.to_string());
        }
    }

    /// Clear when every catalog field is visible, otherwise show all of
    /// them in catalog order.
    pub fn toggle_all(&mut self, catalog: &FieldCatalog) {
        if self.fields.len() == catalog.len() {
            self.fields.clear();
        } else {
            self.fields = catalog.names().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterScope {
    All,
    Field(String),
}

#[derive(Debug, Clone)]
pub struct FilterState {
    pub query: String,
    pub scope: FilterScope,
}

impl Default for FilterState {
    fn default() -> Self {
        FilterState {
            query: String::new(),
            scope: FilterScope::All,
        }
    }
}

impl FilterState {
    pub fn scoped(query: &str, field: &str, catalog: &FieldCatalog) -> Result<Self, CvaError> {
        catalog.require(field)?;
        Ok(FilterState {
            query: query.to_string(),
            scope: FilterScope::Field(field.to_string()),
        })
    }

    pub fn across_all(query: &str) -> Self {
        FilterState {
            query: query.to_string(),
            scope: FilterScope::All,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }
}

// Lists match per element; the joined display form would let "22, 30"
// style queries match across elements.
fn value_matches(value: &Value, needle: &str) -> bool {
    match value {
        Value::List(items) => items
            .iter()
            .any(|item| item.to_lowercase().contains(needle)),
        other => other.display().to_lowercase().contains(needle),
    }
}

fn record_matches(record: &Record, needle: &str, filter: &FilterState, visible: &VisibleFields) -> bool {
    match &filter.scope {
        // Only fields that are currently rendered participate. A match
        // hiding in a toggled-off column must not surface the row.
        FilterScope::All => visible
            .names()
            .iter()
            .any(|field| value_matches(record.get(field), needle)),
        // A named scope is tested even when the field is hidden.
        FilterScope::Field(field) => value_matches(record.get(field), needle),
    }
}

/// Reduce the record list to the indices of matching rows. Pure; the
/// result is a stable-order subsequence of the input. An empty query
/// matches everything.
pub fn filter_rows(records: &[Record], filter: &FilterState, visible: &VisibleFields) -> Vec<usize> {
    if !filter.is_active() {
        return (0..records.len()).collect();
    }
    let needle = filter.query.to_lowercase();

    let rows: Vec<usize> = records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| record_matches(record, &needle, filter, visible))
        .map(|(idx, _)| idx)
        .collect();

    trace!(
        "Filter \"{}\" ({:?}): {} of {} rows",
        filter.query,
        filter.scope,
        rows.len(),
        records.len()
    );
    rows
}

/// 1-based fixed-size paging over a filtered row set.
#[derive(Debug, Clone)]
pub struct Pager {
    current: usize,
    page_size: usize,
    policy: PagePolicy,
}

impl Pager {
    pub fn new(page_size: usize, policy: PagePolicy) -> Self {
        Pager {
            current: 1,
            page_size: page_size.max(1),
            policy,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Never 0, even for an empty row set; page 1 then yields an empty
    /// slice.
    pub fn total_pages(&self, nrows: usize) -> usize {
        nrows.div_ceil(self.page_size).max(1)
    }

    /// The current page's sub-slice of the filtered rows.
    pub fn slice<'a>(&self, rows: &'a [usize]) -> &'a [usize] {
        let begin = (self.current - 1) * self.page_size;
        if begin >= rows.len() {
            return &[];
        }
        let end = std::cmp::min(begin + self.page_size, rows.len());
        &rows[begin..end]
    }

    /// Request a specific page. Out-of-range targets are clamped or
    /// rejected depending on the configured policy; returns whether the
    /// current page changed.
    pub fn set_page(&mut self, page: usize, nrows: usize) -> bool {
        let total = self.total_pages(nrows);
        let target = match self.policy {
            PagePolicy::Clamp => page.clamp(1, total),
            PagePolicy::Reject => {
                if page < 1 || page > total {
                    return false;
                }
                page
            }
        };
        let changed = target != self.current;
        self.current = target;
        changed
    }

    pub fn next(&mut self, nrows: usize) -> bool {
        self.set_page(self.current + 1, nrows)
    }

    pub fn prev(&mut self, nrows: usize) -> bool {
        if self.current == 1 {
            return false;
        }
        self.set_page(self.current - 1, nrows)
    }

    pub fn last(&mut self, nrows: usize) -> bool {
        self.set_page(self.total_pages(nrows), nrows)
    }

    /// Back to page 1. Callers invoke this whenever the filtered set
    /// changes (new fetch, changed query or scope).
    pub fn reset(&mut self) {
        self.current = 1;
    }
}
