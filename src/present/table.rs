//! Text rendering of query results.

use std::fmt;

use serde::Serialize;

use crate::query::QueryResult;

const NULL_TEXT: &str = "NULL";

/// Maximum rendered width of a single cell in the inline table.
const MAX_CELL_WIDTH: usize = 40;

/// Rows rendered inline, with the full count kept for the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
    pub total_rows: usize,
}

impl InlineTable {
    /// Take at most `max_rows` rows from `result`.
    pub fn new(result: &QueryResult, max_rows: usize) -> Self {
        Self {
            columns: result.columns.clone(),
            rows: result.rows.iter().take(max_rows).cloned().collect(),
            total_rows: result.row_count(),
        }
    }

    /// True when some rows were left out of the display.
    pub fn truncated(&self) -> bool {
        self.rows.len() < self.total_rows
    }
}

impl fmt::Display for InlineTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| truncate(cell_text(v), MAX_CELL_WIDTH)).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (i, value) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(value.chars().count());
                }
            }
        }

        let border: String = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        let border = format!("+{}+", border);

        writeln!(f, "{}", border)?;
        write_row(f, self.columns.iter().map(String::as_str), &widths)?;
        writeln!(f, "{}", border)?;
        for row in &cells {
            write_row(f, row.iter().map(String::as_str), &widths)?;
        }
        write!(f, "{}", border)?;

        if self.truncated() {
            write!(
                f,
                "\n({} of {} rows shown)",
                self.rows.len(),
                self.total_rows
            )?;
        }
        Ok(())
    }
}

fn write_row<'a>(
    f: &mut fmt::Formatter<'_>,
    values: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> fmt::Result {
    write!(f, "|")?;
    for (value, width) in values.zip(widths) {
        write!(f, " {:<width$} |", value, width = width)?;
    }
    writeln!(f)
}

fn cell_text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NULL_TEXT)
}

fn truncate(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else {
        let take = max_width.saturating_sub(3);
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

/// Render rows with a leading positional index, right-aligned.
///
/// This is the layout the summary prompt's example uses, so the model sees
/// the same shape it was shown.
pub fn render_indexed(result: &QueryResult) -> String {
    if result.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let index_width = result
        .row_count()
        .saturating_sub(1)
        .to_string()
        .len();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &result.rows {
        for (i, value) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(value.as_deref().unwrap_or("None").chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(result.row_count() + 1);

    let mut header = " ".repeat(index_width);
    for (column, width) in result.columns.iter().zip(&widths) {
        header.push_str(&format!("  {:>width$}", column, width = width));
    }
    lines.push(header);

    for (i, row) in result.rows.iter().enumerate() {
        let mut line = format!("{:<index_width$}", i, index_width = index_width);
        for (value, width) in row.iter().zip(&widths) {
            let text = value.as_deref().unwrap_or("None");
            line.push_str(&format!("  {:>width$}", text, width = width));
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn genres() -> QueryResult {
        QueryResult::new(
            vec!["Name".to_string(), "TrackCount".to_string()],
            vec![
                vec![Some("Rock".to_string()), Some("1297".to_string())],
                vec![Some("Latin".to_string()), Some("579".to_string())],
                vec![Some("Metal".to_string()), None],
            ],
        )
    }

    #[test]
    fn test_render_indexed() {
        let text = render_indexed(&genres());
        assert_eq!(
            text,
            "    Name  TrackCount\n\
             0   Rock        1297\n\
             1  Latin         579\n\
             2  Metal        None"
        );
    }

    #[test]
    fn test_inline_table_display() {
        let table = InlineTable::new(&genres(), 10);
        assert!(!table.truncated());
        assert_eq!(
            table.to_string(),
            "+-------+------------+\n\
             | Name  | TrackCount |\n\
             +-------+------------+\n\
             | Rock  | 1297       |\n\
             | Latin | 579        |\n\
             | Metal | NULL       |\n\
             +-------+------------+"
        );
    }

    #[test]
    fn test_inline_table_caps_rows() {
        let table = InlineTable::new(&genres(), 2);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.total_rows, 3);
        assert!(table.truncated());
        assert!(table.to_string().ends_with("(2 of 3 rows shown)"));
    }

    #[test]
    fn test_long_cells_are_truncated() {
        let result = QueryResult::new(
            vec!["Composer".to_string()],
            vec![vec![Some("x".repeat(100))]],
        );
        let text = InlineTable::new(&result, 10).to_string();
        assert!(text.contains(&format!("{}...", "x".repeat(37))));
        assert!(!text.contains(&"x".repeat(41)));
    }
}
