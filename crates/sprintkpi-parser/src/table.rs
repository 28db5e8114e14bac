//! Azure DevOps work item table of the Data sheet

use std::sync::OnceLock;

use regex::Regex;
use sprintkpi_core::{CellSource, CellValue, Column, RawWorkItem, SchemaError};

use crate::schema::{column_aliases, resolve_headers, WORK_ITEM_HEADER_ROW};

/// Read work item rows below the header row.
///
/// Rows are read from the row after the header until the first row whose
/// mapped cells are all blank. Each returned row has an entry for every
/// column present in the header, blank or not.
pub fn extract_work_items<S: CellSource + ?Sized>(source: &S) -> Result<Vec<RawWorkItem>, SchemaError> {
    let columns = resolve_headers(
        source,
        WORK_ITEM_HEADER_ROW,
        &Column::ALL,
        column_aliases,
        |c| c.label(),
        |c| c.is_required(),
    )?;

    let team_from_area_path = columns
        .get(&Column::Team)
        .is_some_and(|resolved| column_aliases(Column::Team)[resolved.alias] == "Area Path");

    let mut items = Vec::new();
    for row in (WORK_ITEM_HEADER_ROW + 1)..=source.max_row() {
        let values: Vec<(Column, CellValue)> = columns
            .iter()
            .map(|(&column, resolved)| (column, source.cell(row, resolved.col)))
            .collect();

        if values.iter().all(|(_, value)| value.is_blank()) {
            break;
        }

        let mut item = RawWorkItem::new(row);
        for (column, value) in values {
            let value = match column {
                Column::AssignedTo => strip_email(value),
                Column::Team if team_from_area_path => last_path_segment(value),
                _ => value,
            };
            item.cells.insert(column, value);
        }
        items.push(item);
    }

    tracing::debug!(sheet = source.sheet_name(), rows = items.len(), "read work item table");
    Ok(items)
}

/// `Maria Rossi <maria@contoso.com>` becomes `Maria Rossi`
fn strip_email(value: CellValue) -> CellValue {
    static EMAIL: OnceLock<Regex> = OnceLock::new();

    let CellValue::Text(text) = &value else {
        return value;
    };
    let re = EMAIL.get_or_init(|| Regex::new(r"^\s*(.*?)\s*<[^<>]*>\s*$").expect("valid regex"));
    let name = re
        .captures(text)
        .map(|caps| caps[1].to_string())
        .filter(|name| !name.is_empty());
    match name {
        Some(name) => CellValue::text(name),
        None => value,
    }
}

/// `Contoso\Platform\Core` becomes `Core`
fn last_path_segment(value: CellValue) -> CellValue {
    match &value {
        CellValue::Text(text) => match text.trim().rsplit('\\').next().map(str::trim) {
            Some(segment) if !segment.is_empty() => CellValue::text(segment),
            _ => value,
        },
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sprintkpi_core::Grid;

    fn table() -> Grid {
        let mut grid = Grid::new("Data");
        grid.set(3, 1, "Sprint Name");
        grid.set(3, 2, "Sprint 5");
        grid.set_row(21, 1, ["ID", "Work Item Type", "Title", "Assigned To", "State", "Effort", "Area Path"]);
        grid.set_row(22, 1, ["101", "Task", "Login page", "Maria Rossi <maria@contoso.com>", "Done", "3", "Contoso\\Core"]);
        grid.set_row(23, 1, ["102", "Bug", "Crash on save", "", "Active", "", "Contoso\\Platform"]);
        grid
    }

    #[test]
    fn reads_rows_until_end_of_table() {
        let items = extract_work_items(&table()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].row, 22);
        assert_eq!(items[1].row, 23);
    }

    #[test]
    fn strips_email_and_area_path() {
        let items = extract_work_items(&table()).unwrap();
        assert_eq!(items[0].get(Column::AssignedTo), &CellValue::text("Maria Rossi"));
        assert_eq!(items[0].get(Column::Team), &CellValue::text("Core"));
        assert_eq!(items[1].get(Column::Team), &CellValue::text("Platform"));
    }

    #[test]
    fn blank_cells_of_present_columns_are_kept() {
        let items = extract_work_items(&table()).unwrap();
        assert!(items[1].has_column(Column::AssignedTo));
        assert!(items[1].get(Column::AssignedTo).is_blank());
        assert!(items[1].get(Column::Effort).is_blank());
        assert!(!items[1].has_column(Column::Category));
    }

    #[test]
    fn stops_at_first_blank_row() {
        let mut grid = table();
        grid.set_row(25, 1, ["103", "Task", "After the gap", "Luca", "New", "1"]);
        let items = extract_work_items(&grid).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn header_only_table_is_empty() {
        let mut grid = Grid::new("Data");
        grid.set_row(21, 1, ["ID", "Work Item Type", "State", "Assigned To", "Effort"]);
        assert_eq!(extract_work_items(&grid).unwrap(), vec![]);
    }

    #[test]
    fn team_column_is_not_split() {
        let mut grid = Grid::new("Data");
        grid.set_row(21, 1, ["ID", "Work Item Type", "State", "Assigned To", "Effort", "Team"]);
        grid.set_row(22, 1, ["1", "Task", "New", "Luca", "2", "R\\D"]);
        let items = extract_work_items(&grid).unwrap();
        assert_eq!(items[0].get(Column::Team), &CellValue::text("R\\D"));
    }

    #[test]
    fn strip_email_variants() {
        assert_eq!(strip_email(CellValue::text("Luca <l@x.io>")), CellValue::text("Luca"));
        assert_eq!(strip_email(CellValue::text("Luca")), CellValue::text("Luca"));
        assert_eq!(strip_email(CellValue::text("<l@x.io>")), CellValue::text("<l@x.io>"));
        assert_eq!(strip_email(CellValue::Number(3.0)), CellValue::Number(3.0));
    }
}
