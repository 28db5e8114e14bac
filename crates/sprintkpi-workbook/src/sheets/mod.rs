//! Builders for the five sheets a run writes
//!
//! The analysis and indicator sheets are built whole. The history and CMMI
//! sheets keep their earlier content, so their builders read the current
//! grid and return only the cells to change.

use std::collections::BTreeMap;

use sprintkpi_core::{CellRef, CellValue};

pub mod analysis;
pub mod cmmi;
pub mod history;
pub mod indicators;

pub use analysis::{build_analysis_sheet, AnalysisInputs, AnalysisLayout};
pub use cmmi::plan_cmmi_row;
pub use history::plan_history_column;
pub use indicators::build_indicators_sheet;

/// Cells to set on an existing sheet; `CellValue::Empty` clears
pub type CellPatch = BTreeMap<CellRef, CellValue>;

/// Last column of `row` holding a non-blank cell
fn last_used_col<S: sprintkpi_core::CellSource + ?Sized>(sheet: &S, row: u32) -> Option<u32> {
    (1..=sheet.max_col()).rev().find(|&col| !sheet.cell(row, col).is_blank())
}
