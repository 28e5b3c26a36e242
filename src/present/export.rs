//! Spreadsheet export of full result sets.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook};
use uuid::Uuid;

use crate::error::ExportError;
use crate::query::QueryResult;

/// File name offered to the user for every export.
pub const EXPORT_FILE_NAME: &str = "query_results.xlsx";

/// MIME type of the exported workbook.
pub const EXPORT_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SHEET_NAME: &str = "Sheet1";

// xlsx hard limits; the header takes one row.
const MAX_ROWS: usize = 1_048_576 - 1;
const MAX_COLUMNS: usize = 16_384;

/// A downloadable workbook holding every row of a result.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub id: Uuid,
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub row_count: usize,
    pub column_count: usize,
}

impl ExportArtifact {
    /// Build a single-sheet workbook from the full, untruncated result.
    pub fn from_result(result: &QueryResult) -> Result<Self, ExportError> {
        if result.row_count() > MAX_ROWS {
            return Err(ExportError::TooManyRows(result.row_count()));
        }
        if result.column_count() > MAX_COLUMNS {
            return Err(ExportError::TooManyColumns(result.column_count()));
        }

        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        // Bounds were checked above, so the casts cannot truncate.
        for (c, name) in result.columns.iter().enumerate() {
            sheet.write_string_with_format(0, c as u16, name, &header)?;
        }

        for (r, row) in result.rows.iter().enumerate() {
            let sheet_row = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                let Some(value) = value else { continue };
                match as_number(value) {
                    Some(number) => {
                        sheet.write_number(sheet_row, c as u16, number)?;
                    }
                    None => {
                        sheet.write_string(sheet_row, c as u16, value)?;
                    }
                }
            }
        }

        let bytes = workbook.save_to_buffer()?;

        tracing::debug!(
            rows = result.row_count(),
            columns = result.column_count(),
            size = bytes.len(),
            "Built spreadsheet export"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            file_name: EXPORT_FILE_NAME,
            mime_type: EXPORT_MIME_TYPE,
            bytes,
            row_count: result.row_count(),
            column_count: result.column_count(),
        })
    }

    /// Write the workbook into `dir` under a name unique to this artifact.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let stem = EXPORT_FILE_NAME.trim_end_matches(".xlsx");
        let short_id = &self.id.simple().to_string()[..8];
        let path = dir.join(format!("{}-{}.xlsx", stem, short_id));
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Numeric text becomes a number cell; codes with leading zeros stay text.
fn as_number(value: &str) -> Option<f64> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let mut chars = digits.chars();
    if let (Some('0'), Some(next)) = (chars.next(), chars.next()) {
        if next.is_ascii_digit() {
            return None;
        }
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}
