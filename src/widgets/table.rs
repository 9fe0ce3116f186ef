//! Generic data table.
//!
//! [`DataTable`] is generic over the row type. Columns pull a [`CellValue`]
//! out of a row through a closure; the global search instead looks at every
//! field of the serialized row. Rows flow through filter, sort and paginate in
//! that order, and each stage keeps its own state.

use super::WidgetError;
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZES: [usize; 5] = [10, 20, 30, 40, 50];

type Accessor<R> = Arc<dyn Fn(&R) -> CellValue + Send + Sync>;
type RowClickCallback<R> = Box<dyn FnMut(&R) + Send>;

/// A single cell, comparable across rows of the same column.
///
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    fn rank(&self) -> u8 {
        match self {
            CellValue::Empty => 0,
            CellValue::Bool(_) => 1,
            CellValue::Number(_) => 2,
            CellValue::Text(_) => 3,
        }
    }

    /// Total order used for sorting: empties first, then by value.
    ///
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Number(f64::from(value))
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Column definition.
///
pub struct Column<R> {
    pub id: String,
    pub header: String,
    pub sortable: bool,
    pub filterable: bool,
    accessor: Accessor<R>,
}

impl<R: 'static> Column<R> {
    pub fn new<F, V>(id: impl Into<String>, header: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&R) -> V + Send + Sync + 'static,
        V: Into<CellValue> + 'static,
    {
        Column {
            id: id.into(),
            header: header.into(),
            sortable: true,
            filterable: true,
            accessor: Arc::new(move |row: &R| accessor(row).into()),
        }
    }
}

impl<R> Column<R> {
    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn unfilterable(mut self) -> Self {
        self.filterable = false;
        self
    }

    pub fn value(&self, row: &R) -> CellValue {
        (self.accessor)(row)
    }
}

/// Feature toggles.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFeatures {
    pub searchable: bool,
    pub filterable_columns: bool,
    pub selectable: bool,
    pub paginated: bool,
}

impl Default for TableFeatures {
    fn default() -> Self {
        TableFeatures {
            searchable: true,
            filterable_columns: false,
            selectable: false,
            paginated: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Table widget over rows of type `R`.
///
pub struct DataTable<R> {
    columns: Vec<Column<R>>,
    rows: Vec<R>,
    // Lowercased text of every field of every row, indexed like `rows`.
    search_index: Vec<Vec<String>>,
    features: TableFeatures,
    sort: Option<SortSpec>,
    column_filters: BTreeMap<String, String>,
    global_filter: String,
    hidden_columns: HashSet<String>,
    selected: BTreeSet<usize>,
    page_index: usize,
    page_size: usize,
    page_sizes: Vec<usize>,
    on_row_click: Option<RowClickCallback<R>>,
}

impl<R: Serialize> DataTable<R> {
    /// Build a table over `rows`. Each row is serialized once to back the
    /// global search.
    ///
    pub fn new(columns: Vec<Column<R>>, rows: Vec<R>, features: TableFeatures) -> Result<Self, WidgetError> {
        let search_index = rows
            .iter()
            .map(record_fields)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Indexed {} table rows", rows.len());
        Ok(DataTable {
            columns,
            rows,
            search_index,
            features,
            sort: None,
            column_filters: BTreeMap::new(),
            global_filter: String::new(),
            hidden_columns: HashSet::new(),
            selected: BTreeSet::new(),
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZES[0],
            page_sizes: DEFAULT_PAGE_SIZES.to_vec(),
            on_row_click: None,
        })
    }

    /// Replace the dataset, keeping view settings but dropping the selection.
    ///
    pub fn set_rows(&mut self, rows: Vec<R>) -> Result<(), WidgetError> {
        self.search_index = rows
            .iter()
            .map(record_fields)
            .collect::<Result<Vec<_>, _>>()?;
        self.rows = rows;
        self.selected.clear();
        self.page_index = 0;
        Ok(())
    }
}

impl<R> DataTable<R> {
    /// Restrict the page size menu. The first entry becomes the page size.
    ///
    pub fn with_page_sizes(mut self, page_sizes: Vec<usize>) -> Self {
        let page_sizes: Vec<usize> = page_sizes.into_iter().filter(|s| *s > 0).collect();
        if let Some(first) = page_sizes.first() {
            self.page_size = *first;
            self.page_sizes = page_sizes;
        }
        self
    }

    /// Start on `size` when it is one of the menu entries.
    ///
    pub fn with_page_size(mut self, size: usize) -> Self {
        if self.page_sizes.contains(&size) {
            self.page_size = size;
        }
        self
    }

    pub fn on_row_click<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&R) + Send + 'static,
    {
        self.on_row_click = Some(Box::new(callback));
        self
    }

    fn column(&self, id: &str) -> Result<&Column<R>, WidgetError> {
        self.columns
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| WidgetError::UnknownColumn(id.to_string()))
    }

    fn matches_filters(&self, index: usize) -> bool {
        if self.features.searchable && !self.global_filter.is_empty() {
            let query = self.global_filter.to_lowercase();
            if !self.search_index[index].iter().any(|field| field.contains(&query)) {
                return false;
            }
        }
        if self.features.filterable_columns {
            let row = &self.rows[index];
            for (id, filter) in &self.column_filters {
                let Some(column) = self.columns.iter().find(|c| c.id == *id) else {
                    continue;
                };
                let cell = column.value(row).to_string().to_lowercase();
                if !cell.contains(&filter.to_lowercase()) {
                    return false;
                }
            }
        }
        true
    }

    /// Indices into the dataset of the rows passing every filter.
    ///
    pub fn filtered_indices(&self) -> Vec<usize> {
        (0..self.rows.len()).filter(|i| self.matches_filters(*i)).collect()
    }

    /// Filtered indices in display order.
    ///
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices = self.filtered_indices();
        if let Some(spec) = &self.sort {
            if let Some(column) = self.columns.iter().find(|c| c.id == spec.column) {
                indices.sort_by(|a, b| {
                    let ordering = column.value(&self.rows[*a]).compare(&column.value(&self.rows[*b]));
                    match spec.direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    }
                });
            }
        }
        indices
    }

    /// Dataset indices of the rows on the current page.
    ///
    pub fn page_indices(&self) -> Vec<usize> {
        let sorted = self.sorted_indices();
        if !self.features.paginated {
            return sorted;
        }
        sorted
            .into_iter()
            .skip(self.page_index * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Rows on the current page, in display order.
    ///
    pub fn page_rows(&self) -> Vec<&R> {
        self.page_indices().into_iter().map(|i| &self.rows[i]).collect()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&R> {
        self.rows.get(index)
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered_indices().len()
    }

    pub fn features(&self) -> TableFeatures {
        self.features
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn visible_columns(&self) -> Vec<&Column<R>> {
        self.columns
            .iter()
            .filter(|c| !self.hidden_columns.contains(&c.id))
            .collect()
    }

    // Search and filters

    pub fn set_global_filter(&mut self, query: impl Into<String>) {
        self.global_filter = query.into();
        self.page_index = 0;
    }

    pub fn global_filter(&self) -> &str {
        &self.global_filter
    }

    /// Set a contains-filter on one column; an empty value removes it.
    ///
    pub fn set_column_filter(&mut self, column: &str, value: impl Into<String>) -> Result<(), WidgetError> {
        if !self.column(column)?.filterable {
            return Ok(());
        }
        let value = value.into();
        if value.is_empty() {
            self.column_filters.remove(column);
        } else {
            self.column_filters.insert(column.to_string(), value);
        }
        self.page_index = 0;
        Ok(())
    }

    pub fn column_filter(&self, column: &str) -> Option<&str> {
        self.column_filters.get(column).map(String::as_str)
    }

    pub fn clear_filters(&mut self) {
        self.global_filter.clear();
        self.column_filters.clear();
        self.page_index = 0;
    }

    // Sorting

    /// Cycle a column through ascending, descending and unsorted.
    ///
    pub fn toggle_sort(&mut self, column: &str) -> Result<Option<SortDirection>, WidgetError> {
        if !self.column(column)?.sortable {
            return Ok(None);
        }
        let next = match &self.sort {
            Some(spec) if spec.column == column => match spec.direction {
                SortDirection::Ascending => Some(SortDirection::Descending),
                SortDirection::Descending => None,
            },
            _ => Some(SortDirection::Ascending),
        };
        self.sort = next.map(|direction| SortSpec {
            column: column.to_string(),
            direction,
        });
        debug!("Sort on '{}' is now {:?}", column, next);
        Ok(next)
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn sort_direction(&self, column: &str) -> Option<SortDirection> {
        self.sort
            .as_ref()
            .filter(|spec| spec.column == column)
            .map(|spec| spec.direction)
    }

    // Column visibility

    pub fn toggle_column_visibility(&mut self, column: &str) -> Result<bool, WidgetError> {
        self.column(column)?;
        if self.hidden_columns.remove(column) {
            Ok(true)
        } else {
            self.hidden_columns.insert(column.to_string());
            Ok(false)
        }
    }

    pub fn is_column_visible(&self, column: &str) -> bool {
        !self.hidden_columns.contains(column)
    }

    // Selection

    /// Toggle selection of a dataset row. Returns the new state.
    ///
    pub fn toggle_selected(&mut self, index: usize) -> bool {
        if !self.features.selectable || index >= self.rows.len() {
            return false;
        }
        if self.selected.remove(&index) {
            false
        } else {
            self.selected.insert(index);
            true
        }
    }

    /// Select every row on the page, or deselect them if all already are.
    ///
    pub fn toggle_page_selected(&mut self) {
        if !self.features.selectable {
            return;
        }
        let page = self.page_indices();
        if page.iter().all(|i| self.selected.contains(i)) {
            for i in &page {
                self.selected.remove(i);
            }
        } else {
            self.selected.extend(page);
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Number of selected rows among the currently filtered ones.
    ///
    pub fn selected_count(&self) -> usize {
        self.filtered_indices()
            .iter()
            .filter(|i| self.selected.contains(i))
            .count()
    }

    pub fn selected_rows(&self) -> Vec<&R> {
        self.filtered_indices()
            .into_iter()
            .filter(|i| self.selected.contains(i))
            .map(|i| &self.rows[i])
            .collect()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    // Pagination

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_sizes(&self) -> &[usize] {
        &self.page_sizes
    }

    pub fn page_count(&self) -> usize {
        if !self.features.paginated {
            return 1;
        }
        self.filtered_len().div_ceil(self.page_size)
    }

    /// Change the page size, keeping the first visible row on screen.
    ///
    pub fn set_page_size(&mut self, size: usize) -> Result<(), WidgetError> {
        if !self.page_sizes.contains(&size) {
            return Err(WidgetError::InvalidPageSize(size));
        }
        let first_row = self.page_index * self.page_size;
        self.page_size = size;
        self.page_index = first_row / size;
        Ok(())
    }

    pub fn can_previous_page(&self) -> bool {
        self.page_index > 0
    }

    pub fn can_next_page(&self) -> bool {
        self.page_index + 1 < self.page_count()
    }

    pub fn first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn previous_page(&mut self) {
        if self.can_previous_page() {
            self.page_index -= 1;
        }
    }

    pub fn next_page(&mut self) {
        if self.can_next_page() {
            self.page_index += 1;
        }
    }

    pub fn last_page(&mut self) {
        self.page_index = self.page_count().saturating_sub(1);
    }

    /// One-based range of rows shown and the filtered total.
    ///
    pub fn showing(&self) -> (usize, usize, usize) {
        let total = self.filtered_len();
        if total == 0 {
            return (0, 0, 0);
        }
        if !self.features.paginated {
            return (1, total, total);
        }
        let start = self.page_index * self.page_size + 1;
        let end = (start + self.page_size - 1).min(total);
        (start, end, total)
    }

    // Events

    /// Deliver the row at `position` on the current page to the row-click
    /// callback.
    ///
    pub fn click_row(&mut self, position: usize) -> bool {
        let Some(index) = self.page_indices().get(position).copied() else {
            return false;
        };
        if let Some(callback) = self.on_row_click.as_mut() {
            callback(&self.rows[index]);
        }
        true
    }
}

/// Stringify every top-level field of a serialized record.
///
fn record_fields<R: Serialize>(row: &R) -> Result<Vec<String>, WidgetError> {
    let value = serde_json::to_value(row).map_err(|e| WidgetError::RowSerialization(e.to_string()))?;
    let fields = match value {
        Value::Object(map) => map.into_iter().map(|(_, v)| stringify(&v)).collect(),
        Value::Array(items) => items.iter().map(stringify).collect(),
        other => vec![stringify(&other)],
    };
    Ok(fields)
}

fn stringify(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    };
    text.to_lowercase()
}
