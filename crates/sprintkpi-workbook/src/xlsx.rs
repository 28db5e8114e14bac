//! `.xlsx` backend over umya-spreadsheet
//!
//! The workbook is loaded fully into memory, edited there and serialized
//! back in one piece. Sheets the pipeline does not write keep their cells,
//! and the VBA project of an `.xlsm` workbook is written back as read.

use std::collections::BTreeMap;
use std::io::Cursor;

use sprintkpi_core::{CellRef, CellSource, CellValue, Grid, ProcessError, WorkbookStructureError};
use umya_spreadsheet::{Cell, CellRawValue, Spreadsheet, Worksheet};

use crate::store::WorkbookStore;

/// An `.xlsx` workbook loaded in memory
#[derive(Debug)]
pub struct XlsxWorkbook {
    book: Spreadsheet,
}

impl XlsxWorkbook {
    /// Parse workbook bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProcessError> {
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
            .map_err(|e| ProcessError::Xlsx(e.to_string()))?;
        tracing::debug!(
            sheets = book.get_sheet_collection().len(),
            macros = book.get_has_macros(),
            "loaded workbook"
        );
        Ok(Self { book })
    }

    /// Serialize the workbook
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProcessError> {
        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut cursor)
            .map_err(|e| ProcessError::Xlsx(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Read-only view of one sheet, formula cells as formulas
    pub fn view(&self, name: &str) -> Option<SheetView<'_>> {
        self.book
            .get_sheet_by_name(name)
            .map(|sheet| SheetView::new(sheet, CellRead::Formulas))
    }

    /// Read-only view of one sheet, formula cells as their cached results
    pub fn value_view(&self, name: &str) -> Option<SheetView<'_>> {
        self.book
            .get_sheet_by_name(name)
            .map(|sheet| SheetView::new(sheet, CellRead::CachedValues))
    }
}

/// How a [`SheetView`] reports formula cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellRead {
    /// The formula expression, for sheets the pipeline rewrites
    Formulas,
    /// The result Excel stored with the formula, for input sheets
    CachedValues,
}

/// [`CellSource`] over a umya worksheet, read in place
pub struct SheetView<'a> {
    sheet: &'a Worksheet,
    mode: CellRead,
    max_col: u32,
    max_row: u32,
}

impl<'a> SheetView<'a> {
    pub fn new(sheet: &'a Worksheet, mode: CellRead) -> Self {
        let (max_col, max_row) = sheet.get_highest_column_and_row();
        Self {
            sheet,
            mode,
            max_col,
            max_row,
        }
    }

    /// Copy every non-empty cell into a grid
    pub fn to_grid(&self) -> Grid {
        let mut grid = Grid::new(self.sheet_name());
        for row in 1..=self.max_row {
            for col in 1..=self.max_col {
                let value = self.cell(row, col);
                if value != CellValue::Empty {
                    grid.set(row, col, value);
                }
            }
        }
        grid
    }
}

impl CellSource for SheetView<'_> {
    fn sheet_name(&self) -> &str {
        self.sheet.get_name()
    }

    fn cell(&self, row: u32, col: u32) -> CellValue {
        let Some(cell) = self.sheet.get_cell((col, row)) else {
            return CellValue::Empty;
        };
        match self.mode {
            CellRead::Formulas if cell.is_formula() => CellValue::formula(cell.get_formula()),
            _ => read_value(cell),
        }
    }

    fn max_row(&self) -> u32 {
        self.max_row
    }

    fn max_col(&self) -> u32 {
        self.max_col
    }
}

/// Stored value of a cell; for a formula cell this is its last computed result
fn read_value(cell: &Cell) -> CellValue {
    match cell.get_raw_value() {
        CellRawValue::Empty => CellValue::Empty,
        CellRawValue::Numeric(n) => CellValue::Number(*n),
        CellRawValue::Bool(b) => CellValue::Bool(*b),
        _ => {
            let text = cell.get_value();
            if text.is_empty() {
                CellValue::Empty
            } else {
                CellValue::text(text.into_owned())
            }
        }
    }
}

fn write_cell(sheet: &mut Worksheet, at: CellRef, value: &CellValue) {
    let coordinate = (at.col, at.row);
    // a fresh cell drops any formula or value type left from before
    sheet.remove_cell(coordinate);
    match value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            sheet.get_cell_mut(coordinate).set_value_number(*n);
        }
        CellValue::Text(s) => {
            sheet.get_cell_mut(coordinate).set_value_string(s.clone());
        }
        CellValue::Bool(b) => {
            sheet.get_cell_mut(coordinate).set_value_bool(*b);
        }
        CellValue::Formula(expr) => {
            sheet.get_cell_mut(coordinate).set_formula(expr.clone());
        }
    }
}

fn clear_sheet(sheet: &mut Worksheet) {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    for row in 1..=max_row {
        for col in 1..=max_col {
            sheet.remove_cell((col, row));
        }
    }
}

impl WorkbookStore for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|s| s.get_name().to_string())
            .collect()
    }

    fn read_sheet(&self, name: &str) -> Option<Grid> {
        self.view(name).map(|view| view.to_grid())
    }

    fn read_values(&self, name: &str) -> Option<Grid> {
        self.value_view(name).map(|view| view.to_grid())
    }

    fn write_sheet(&mut self, grid: &Grid) -> Result<(), WorkbookStructureError> {
        if self.book.get_sheet_by_name(&grid.name).is_none() {
            self.book
                .new_sheet(grid.name.clone())
                .map_err(|reason| WorkbookStructureError::Update {
                    sheet: grid.name.clone(),
                    reason: reason.to_string(),
                })?;
        }
        let sheet = self
            .book
            .get_sheet_by_name_mut(&grid.name)
            .ok_or_else(|| WorkbookStructureError::MissingSheet(grid.name.clone()))?;

        clear_sheet(sheet);
        for (at, value) in grid.iter() {
            write_cell(sheet, *at, value);
        }
        tracing::debug!(sheet = %grid.name, cells = grid.len(), "rewrote sheet");
        Ok(())
    }

    fn write_cells(&mut self, sheet: &str, cells: &BTreeMap<CellRef, CellValue>) -> Result<(), WorkbookStructureError> {
        let target = self
            .book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| WorkbookStructureError::MissingSheet(sheet.to_string()))?;
        for (at, value) in cells {
            write_cell(target, *at, value);
        }
        tracing::debug!(sheet, cells = cells.len(), "patched sheet");
        Ok(())
    }
}
