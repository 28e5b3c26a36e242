//! Choosing how a result reaches the user.
//!
//! Small results are rendered inline (capped at a display row limit). Results
//! with more cells than the threshold become a spreadsheet download instead.

mod export;
mod table;

pub use export::{EXPORT_FILE_NAME, EXPORT_MIME_TYPE, ExportArtifact};
pub use table::{InlineTable, render_indexed};

use crate::config::PresentationConfig;
use crate::error::ExportError;
use crate::query::QueryResult;

/// How one result is delivered.
#[derive(Debug, Clone)]
pub enum Presentation {
    Inline(InlineTable),
    Export(ExportArtifact),
}

/// Applies the cell-count threshold.
#[derive(Debug, Clone)]
pub struct ResultPresenter {
    cell_threshold: usize,
    max_display_rows: usize,
}

impl ResultPresenter {
    pub fn new(cell_threshold: usize, max_display_rows: usize) -> Self {
        Self {
            cell_threshold,
            max_display_rows,
        }
    }

    pub fn from_config(config: &PresentationConfig) -> Self {
        Self::new(config.cell_threshold, config.max_display_rows)
    }

    /// True when the result is too large to show inline.
    pub fn exceeds_threshold(&self, result: &QueryResult) -> bool {
        result.cell_count() > self.cell_threshold
    }

    pub fn present(&self, result: &QueryResult) -> Result<Presentation, ExportError> {
        if self.exceeds_threshold(result) {
            tracing::debug!(
                cells = result.cell_count(),
                threshold = self.cell_threshold,
                "Result exceeds inline threshold, exporting"
            );
            return Ok(Presentation::Export(ExportArtifact::from_result(result)?));
        }
        Ok(Presentation::Inline(InlineTable::new(
            result,
            self.max_display_rows,
        )))
    }
}
