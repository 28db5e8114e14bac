//! Current-sprint "Kpi Indicators" sheet
//!
//! One row per staff member, then one per team. Each KPI cell points at the
//! matching cell of the analysis sheet instead of holding a copy.

use sprintkpi_core::{EntityMetrics, Grid, Kpi, SprintMetadata, KPI_INDICATORS_SHEET};

use super::analysis::AnalysisLayout;
use crate::formula::{Formula, SheetRef};

/// Header row of the indicator table
pub const HEADER_ROW: u32 = 3;

const FIRST_KPI_COL: u32 = 4;

/// Build the sheet from the analysis layout
pub fn build_indicators_sheet(
    metadata: &SprintMetadata,
    analysis_sheet: &SheetRef,
    staff: &[EntityMetrics],
    layout: &AnalysisLayout,
) -> Grid {
    let mut grid = Grid::new(KPI_INDICATORS_SHEET);
    grid.set_row(1, 1, ["Sprint", metadata.sprint_name.as_str()]);
    grid.set_row(2, 1, ["Source", analysis_sheet.name()]);

    grid.set_row(HEADER_ROW, 1, ["Name", "Type", "Team"]);
    grid.set_row(HEADER_ROW, FIRST_KPI_COL, Kpi::ALL.map(|kpi| kpi.label()));

    let mut row = HEADER_ROW;
    for ((name, source_row), metrics) in layout.staff_rows.iter().zip(staff) {
        row += 1;
        grid.set_row(row, 1, [name.as_str(), "Staff"]);
        if let Some(team) = &metrics.team {
            grid.set(row, 3, team.as_str());
        }
        write_kpi_refs(&mut grid, row, analysis_sheet, *source_row);
    }
    for (name, source_row) in &layout.team_rows {
        row += 1;
        grid.set_row(row, 1, [name.as_str(), "Team"]);
        write_kpi_refs(&mut grid, row, analysis_sheet, *source_row);
    }
    grid
}

fn write_kpi_refs(grid: &mut Grid, row: u32, analysis_sheet: &SheetRef, source_row: u32) {
    for (offset, kpi) in Kpi::ALL.into_iter().enumerate() {
        let target = AnalysisLayout::kpi_cell(source_row, kpi);
        grid.set(row, FIRST_KPI_COL + offset as u32, Formula::cross_sheet(analysis_sheet, target));
    }
}
