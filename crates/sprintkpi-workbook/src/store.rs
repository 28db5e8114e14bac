//! Workbook access seam
//!
//! The pipeline reads and writes sheets only through [`WorkbookStore`], so
//! the same planning and apply code runs against an `.xlsx` file
//! ([`crate::xlsx::XlsxWorkbook`]) or an in-memory workbook.

use std::collections::BTreeMap;

use sprintkpi_core::{CellRef, CellValue, Grid, WorkbookStructureError};

/// Sheet-level read/write access to a workbook
pub trait WorkbookStore {
    /// Sheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|n| n == name)
    }

    /// Copy of a sheet's cells, `None` when the sheet does not exist
    fn read_sheet(&self, name: &str) -> Option<Grid>;

    /// Like [`read_sheet`](Self::read_sheet), with formula cells replaced by
    /// their last computed result where the backend stores one
    fn read_values(&self, name: &str) -> Option<Grid> {
        self.read_sheet(name)
    }

    /// Replace the whole contents of `grid.name`, creating the sheet when missing
    fn write_sheet(&mut self, grid: &Grid) -> Result<(), WorkbookStructureError>;

    /// Set individual cells of an existing sheet; `CellValue::Empty` clears a cell
    fn write_cells(&mut self, sheet: &str, cells: &BTreeMap<CellRef, CellValue>) -> Result<(), WorkbookStructureError>;
}

/// Workbook held as grids, in sheet order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryWorkbook {
    sheets: Vec<Grid>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet (builder pattern)
    pub fn with_sheet(mut self, grid: Grid) -> Self {
        self.sheets.retain(|s| s.name != grid.name);
        self.sheets.push(grid);
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&Grid> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Option<&mut Grid> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }
}

impl WorkbookStore for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&self, name: &str) -> Option<Grid> {
        self.sheet(name).cloned()
    }

    fn write_sheet(&mut self, grid: &Grid) -> Result<(), WorkbookStructureError> {
        match self.sheet_mut(&grid.name) {
            Some(existing) => *existing = grid.clone(),
            None => self.sheets.push(grid.clone()),
        }
        Ok(())
    }

    fn write_cells(&mut self, sheet: &str, cells: &BTreeMap<CellRef, CellValue>) -> Result<(), WorkbookStructureError> {
        let grid = self
            .sheet_mut(sheet)
            .ok_or_else(|| WorkbookStructureError::MissingSheet(sheet.to_string()))?;
        for (at, value) in cells {
            grid.set(at.row, at.col, value.clone());
        }
        Ok(())
    }
}
