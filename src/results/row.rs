use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{RowShape, RowValues};

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `column_names` - The column names
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(column_index(&column_names));
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Reshape into the caller-facing row form.
    #[must_use]
    pub fn into_shape(self, shape: RowShape) -> Row {
        match shape {
            RowShape::Tuple => Row::Tuple(self.rows),
            RowShape::Map => Row::Map(
                self.column_names
                    .iter()
                    .cloned()
                    .zip(self.rows)
                    .collect(),
            ),
        }
    }
}

pub(crate) fn column_index(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// A shaped row returned by `Select` / `SelectMany`.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    /// Column name to value. Duplicate column names keep the last value.
    Map(HashMap<String, RowValues>),
    /// Values in column order.
    Tuple(Vec<RowValues>),
}

impl Row {
    /// Value by column name; `None` for tuple rows.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        match self {
            Row::Map(map) => map.get(column_name),
            Row::Tuple(_) => None,
        }
    }

    /// Value by position; `None` for map rows.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        match self {
            Row::Tuple(values) => values.get(index),
            Row::Map(_) => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&HashMap<String, RowValues>> {
        match self {
            Row::Map(map) => Some(map),
            Row::Tuple(_) => None,
        }
    }

    #[must_use]
    pub fn as_tuple(&self) -> Option<&[RowValues]> {
        match self {
            Row::Tuple(values) => Some(values),
            Row::Map(_) => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Row::Map(map) => map.len(),
            Row::Tuple(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
