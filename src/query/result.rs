//! Tabular query results.

use serde::Serialize;

/// Columns and rows returned by one statement.
///
/// Values are kept as the text the server sent; SQL NULL is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Create a result from columns and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// The result substituted when execution fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there are no rows to show.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of cells (rows × columns).
    pub fn cell_count(&self) -> usize {
        self.row_count().saturating_mul(self.column_count())
    }

    /// A copy holding only the first `n` rows.
    pub fn head(&self, n: usize) -> QueryResult {
        QueryResult {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize) -> QueryResult {
        let columns = (0..cols).map(|c| format!("c{}", c)).collect();
        let rows = (0..rows)
            .map(|r| (0..cols).map(|c| Some(format!("{}:{}", r, c))).collect())
            .collect();
        QueryResult::new(columns, rows)
    }

    #[test]
    fn test_cell_count() {
        assert_eq!(grid(10, 7).cell_count(), 70);
        assert_eq!(grid(10, 5).cell_count(), 50);
        assert_eq!(QueryResult::empty().cell_count(), 0);
    }

    #[test]
    fn test_empty_means_no_rows() {
        assert!(QueryResult::empty().is_empty());
        assert!(QueryResult::new(vec!["a".to_string()], vec![]).is_empty());
        assert!(!grid(1, 1).is_empty());
    }

    #[test]
    fn test_head_keeps_columns() {
        let result = grid(25, 3);
        let head = result.head(10);
        assert_eq!(head.row_count(), 10);
        assert_eq!(head.columns, result.columns);
        assert_eq!(head.rows[9], result.rows[9]);

        assert_eq!(grid(2, 3).head(10).row_count(), 2);
    }
}
