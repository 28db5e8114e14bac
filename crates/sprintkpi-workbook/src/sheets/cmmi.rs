//! "CMMI Template" history, one row per sprint
//!
//! Row 1 holds `Sprint` and one header per measure. Missing measure headers
//! are appended; a sprint already listed in column A has its row rewritten.

use sprintkpi_core::{CellRef, CellSource, CellValue, CmmiMeasure, Grid};

use super::analysis::AnalysisLayout;
use super::{last_used_col, CellPatch};
use crate::formula::{Formula, SheetRef};

/// Row listing `sprint_name` in column A, if any
pub fn find_sprint_row(sheet: &Grid, sprint_name: &str) -> Option<u32> {
    let wanted = sprint_name.trim();
    (2..=sheet.max_row()).find(|&row| sheet.cell(row, 1).as_text().as_deref() == Some(wanted))
}

/// Cells that add or refresh the sprint's row
pub fn plan_cmmi_row(sheet: &Grid, sprint_name: &str, analysis_sheet: &SheetRef, layout: &AnalysisLayout) -> CellPatch {
    let mut patch = CellPatch::new();

    if sheet.cell(1, 1).is_blank() {
        patch.insert(CellRef::new(1, 1), CellValue::text("Sprint"));
    }

    let mut next_col = last_used_col(sheet, 1).unwrap_or(1).max(1) + 1;
    let row = find_sprint_row(sheet, sprint_name).unwrap_or_else(|| (sheet.max_row() + 1).max(2));
    patch.insert(CellRef::new(row, 1), CellValue::text(sprint_name.trim()));

    for measure in CmmiMeasure::ALL {
        let col = match find_measure_column(sheet, measure) {
            Some(col) => col,
            None => {
                let col = next_col;
                next_col += 1;
                patch.insert(CellRef::new(1, col), CellValue::text(measure.label()));
                col
            }
        };
        let value = match layout.cmmi_cells.get(&measure) {
            Some(source) => Formula::cross_sheet(analysis_sheet, *source).into(),
            None => CellValue::Empty,
        };
        patch.insert(CellRef::new(row, col), value);
    }

    tracing::debug!(sheet = %sheet.name, row, cells = patch.len(), "planned CMMI row");
    patch
}

fn find_measure_column(sheet: &Grid, measure: CmmiMeasure) -> Option<u32> {
    (2..=sheet.max_col()).find(|&col| {
        sheet
            .cell(1, col)
            .as_text()
            .is_some_and(|header| header.eq_ignore_ascii_case(measure.label()))
    })
}
