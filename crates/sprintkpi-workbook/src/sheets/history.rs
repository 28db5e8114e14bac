//! KPI history sheets, one column per sprint
//!
//! ```text
//! row 1  | Staff | Metric      | Sprint 3 | Sprint 4 | Sprint 5
//! row 2  | Luca  | KPI         | ...
//! row 3  | Luca  | Performance Rate
//! ```
//!
//! The sprint's column is found by its header or appended after the last
//! header. Rows are keyed by (entity, metric) and appended when new. The
//! column is cleared before it is written, so an entity that dropped out of
//! the sprint leaves no stale value behind.

use std::collections::HashMap;

use sprintkpi_core::{normalize_key, CellRef, CellSource, CellValue, Grid, Kpi};

use super::analysis::AnalysisLayout;
use super::{last_used_col, CellPatch};
use crate::formula::{Formula, SheetRef};

/// First column holding sprint values
pub const FIRST_SPRINT_COL: u32 = 3;

/// Column holding `sprint_name`, if the sheet already has one
pub fn find_sprint_column(sheet: &Grid, sprint_name: &str) -> Option<u32> {
    let wanted = sprint_name.trim();
    (FIRST_SPRINT_COL..=sheet.max_col()).find(|&col| sheet.cell(1, col).as_text().as_deref() == Some(wanted))
}

/// Cells that add or refresh the sprint's column.
///
/// `entity_label` heads column A ("Staff" or "Team"); `entities` pairs each
/// display name with its row on the analysis sheet.
pub fn plan_history_column(
    sheet: &Grid,
    entity_label: &str,
    sprint_name: &str,
    analysis_sheet: &SheetRef,
    entities: &[(String, u32)],
) -> CellPatch {
    let mut patch = CellPatch::new();

    if sheet.cell(1, 1).is_blank() {
        patch.insert(CellRef::new(1, 1), CellValue::text(entity_label));
    }
    if sheet.cell(1, 2).is_blank() {
        patch.insert(CellRef::new(1, 2), CellValue::text("Metric"));
    }

    let col = find_sprint_column(sheet, sprint_name).unwrap_or_else(|| {
        let last = last_used_col(sheet, 1).unwrap_or(0);
        (last + 1).max(FIRST_SPRINT_COL)
    });
    patch.insert(CellRef::new(1, col), CellValue::text(sprint_name.trim()));

    for row in 2..=sheet.max_row() {
        if sheet.get(row, col).is_some() {
            patch.insert(CellRef::new(row, col), CellValue::Empty);
        }
    }

    let mut rows = existing_rows(sheet);
    let mut next_row = (sheet.max_row() + 1).max(2);
    for (name, source_row) in entities {
        let entity_key = normalize_key(name);
        for kpi in Kpi::ALL {
            let key = (entity_key.clone(), kpi.label().to_lowercase());
            let row = match rows.get(&key) {
                Some(row) => *row,
                None => {
                    let row = next_row;
                    next_row += 1;
                    patch.insert(CellRef::new(row, 1), CellValue::text(name.as_str()));
                    patch.insert(CellRef::new(row, 2), CellValue::text(kpi.label()));
                    rows.insert(key, row);
                    row
                }
            };
            let target = AnalysisLayout::kpi_cell(*source_row, kpi);
            patch.insert(CellRef::new(row, col), Formula::cross_sheet(analysis_sheet, target).into());
        }
    }

    tracing::debug!(sheet = %sheet.name, column = col, cells = patch.len(), "planned history column");
    patch
}

/// (entity key, lowercase metric) of each labeled row; the first occurrence wins
fn existing_rows(sheet: &Grid) -> HashMap<(String, String), u32> {
    let mut rows = HashMap::new();
    for row in 2..=sheet.max_row() {
        let (Some(entity), Some(metric)) = (sheet.cell(row, 1).as_text(), sheet.cell(row, 2).as_text()) else {
            continue;
        };
        rows.entry((normalize_key(&entity), metric.to_lowercase())).or_insert(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn analysis_sheet() -> SheetRef {
        SheetRef::new("Sprint 5 Analysis")
    }

    fn apply(sheet: &Grid, patch: &CellPatch) -> Grid {
        let mut out = sheet.clone();
        for (at, value) in patch {
            out.set(at.row, at.col, value.clone());
        }
        out
    }

    #[test]
    fn empty_sheet_gets_header_and_rows() {
        let sheet = Grid::new("Kpi Indicators Per Staff");
        let patch = plan_history_column(&sheet, "Staff", "Sprint 5", &analysis_sheet(), &[("Maria".into(), 7)]);
        let out = apply(&sheet, &patch);

        assert_eq!(out.cell(1, 1), CellValue::text("Staff"));
        assert_eq!(out.cell(1, 2), CellValue::text("Metric"));
        assert_eq!(out.cell(1, 3), CellValue::text("Sprint 5"));
        assert_eq!(out.cell(2, 1), CellValue::text("Maria"));
        assert_eq!(out.cell(2, 2), CellValue::text("KPI"));
        assert_eq!(out.cell(2, 3), CellValue::formula("'Sprint 5 Analysis'!P7"));
        assert_eq!(out.cell(7, 2), CellValue::text("Ad-hoc %"));
        assert_eq!(out.max_row(), 7);
    }

    #[test]
    fn new_sprint_appends_after_last_header() {
        let sheet = Grid::new("Kpi Indicators Per Staff")
            .with(1, 1, "Staff")
            .with(1, 2, "Metric")
            .with(1, 3, "Sprint 3")
            .with(1, 4, "Sprint 4")
            .with(2, 1, "Maria")
            .with(2, 2, "KPI")
            .with(2, 3, 0.5)
            .with(2, 4, 0.6);

        let patch = plan_history_column(&sheet, "Staff", "Sprint 5", &analysis_sheet(), &[("maria ".into(), 7)]);
        let out = apply(&sheet, &patch);

        assert_eq!(out.cell(1, 5), CellValue::text("Sprint 5"));
        assert_eq!(out.cell(2, 5), CellValue::formula("'Sprint 5 Analysis'!P7"));
        assert_eq!(out.cell(2, 3), CellValue::Number(0.5));
        assert_eq!(out.cell(2, 4), CellValue::Number(0.6));
        // KPI row reused, the five other metrics appended
        assert_eq!(out.cell(3, 2), CellValue::text("Performance Rate"));
        assert_eq!(out.max_row(), 7);
    }

    #[test]
    fn existing_sprint_column_is_overwritten_in_place() {
        let sheet = Grid::new("Kpi Indicators Per Team")
            .with(1, 1, "Team")
            .with(1, 2, "Metric")
            .with(1, 3, "Sprint 5")
            .with(1, 4, "Sprint 6")
            .with(2, 1, "Core")
            .with(2, 2, "KPI")
            .with(2, 3, "stale")
            .with(3, 1, "Gone")
            .with(3, 2, "KPI")
            .with(3, 3, 0.9);

        let patch = plan_history_column(&sheet, "Team", "Sprint 5", &analysis_sheet(), &[("Core".into(), 10)]);
        let out = apply(&sheet, &patch);

        assert_eq!(find_sprint_column(&out, "Sprint 5"), Some(3));
        assert_eq!(out.cell(1, 5), CellValue::Empty);
        assert_eq!(out.cell(2, 3), CellValue::formula("'Sprint 5 Analysis'!P10"));
        assert_eq!(out.get(3, 3), None);
        assert_eq!(out.cell(3, 1), CellValue::text("Gone"));
    }

    #[test]
    fn planning_twice_is_stable() {
        let sheet = Grid::new("Kpi Indicators Per Staff");
        let entities = [("Luca".to_string(), 6), ("Maria".to_string(), 7)];
        let once = apply(&sheet, &plan_history_column(&sheet, "Staff", "Sprint 5", &analysis_sheet(), &entities));
        let twice = apply(&once, &plan_history_column(&once, "Staff", "Sprint 5", &analysis_sheet(), &entities));
        assert_eq!(once, twice);
    }
}
