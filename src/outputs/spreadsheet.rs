//! Spreadsheet output: one workbook per run, one sheet per collected domain.

use super::tabular::Tabular;
use crate::error::SinkError;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Cell text for an absent field.
pub const ABSENT: &str = "N/A";

pub struct Spreadsheet {
    workbook: Workbook,
    sheets: usize,
    header: Format,
}

impl Spreadsheet {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            sheets: 0,
            header: Format::new().set_bold(),
        }
    }

    /// Append a sheet named [`Tabular::SHEET`]. An empty slice still gets its header row.
    pub fn add_sheet<T: Tabular>(&mut self, rows: &[T]) -> Result<(), SinkError> {
        let sheet = self.workbook.add_worksheet();
        sheet.set_name(T::SHEET)?;

        for (col, title) in T::HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &self.header)?;
        }
        for (i, record) in rows.iter().enumerate() {
            let row = i as u32 + 1;
            for (col, cell) in record.row().into_iter().enumerate() {
                sheet.write_string(row, col as u16, cell.as_deref().unwrap_or(ABSENT))?;
            }
        }
        sheet.autofit();

        self.sheets += 1;
        debug!(sheet = T::SHEET, rows = rows.len(), "Added sheet");
        Ok(())
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display(), sheets = self.sheets))]
    pub fn save(mut self, path: &Path) -> Result<(), SinkError> {
        self.workbook.save(path)?;
        info!("Wrote spreadsheet");
        Ok(())
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}
