//! Integration tests for extracting a realistic Azure DevOps export
//!
//! The Data sheet mimics a workbook where the export was pasted below the
//! metadata block with extra columns the engine does not use.

use chrono::NaiveDate;
use sprintkpi_core::{CellValue, Column, Grid, MetadataError, ProcessError, SchemaError};
use sprintkpi_parser::{extract, ExtractError};

/// Helper to create a date
fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn data_sheet() -> Grid {
    let mut data = Grid::new("Data");
    data.set(1, 1, "Sprint Tracking");
    data.set_row(3, 1, ["Sprint Name:", "Sprint 12"]);
    data.set_row(4, 1, ["Sprint Number:", "Sprint 12"]);
    data.set(5, 1, "Start Date:");
    data.set(5, 2, 45719.0);
    data.set(6, 1, "End Date:");
    data.set(6, 2, 45730.0);
    data.set_row(7, 1, ["Team:", "Core"]);
    data.set_row(
        21,
        1,
        [
            "ID",
            "Work Item Type",
            "Title",
            "Assigned To",
            "State",
            "Tags",
            "Completed Work",
            "Original Estimate",
            "Area Path",
            "Created Date",
            "Category",
        ],
    );
    data.set_row(
        22,
        1,
        [
            "4101",
            "Task",
            "Wire login form",
            "Maria Rossi <maria.rossi@contoso.com>",
            "Closed",
            "ui",
            "6",
            "5",
            "Contoso\\Core",
            "2025-03-01",
            "Planned",
        ],
    );
    data.set_row(
        23,
        1,
        [
            "4102",
            "Bug",
            "Fix token refresh",
            "Luca Bianchi <luca@contoso.com>",
            "Active",
            "",
            "2",
            "",
            "Contoso\\Platform",
            "2025-03-05",
            "Ad-hoc",
        ],
    );
    data
}

fn capacity_sheet() -> Grid {
    let mut capacity = Grid::new("Capacity");
    capacity.set_row(1, 1, ["Name", "Capacity", "Team"]);
    capacity.set_row(2, 1, ["Maria Rossi", "8", "Core"]);
    capacity.set_row(3, 1, ["Luca Bianchi", "10", "Platform"]);
    capacity
}

#[test]
fn extracts_metadata_items_and_capacity() {
    let extraction = extract(&data_sheet(), &capacity_sheet()).expect("should extract");

    assert_eq!(extraction.metadata.sprint_name, "Sprint 12");
    assert_eq!(extraction.metadata.sprint_number, 12);
    assert_eq!(extraction.metadata.start_date, date(2025, 3, 3));
    assert_eq!(extraction.metadata.end_date, date(2025, 3, 14));
    assert_eq!(extraction.metadata.teams, vec!["Core".to_string()]);

    assert_eq!(extraction.items.len(), 2);
    let first = &extraction.items[0];
    assert_eq!(first.get(Column::Id), &CellValue::text("4101"));
    assert_eq!(first.get(Column::AssignedTo), &CellValue::text("Maria Rossi"));
    assert_eq!(first.get(Column::Effort), &CellValue::text("6"));
    assert_eq!(first.get(Column::Team), &CellValue::text("Core"));
    assert_eq!(first.get(Column::CreatedDate).as_date(), Some(date(2025, 3, 1)));
    assert!(!first.has_column(Column::Addition));

    assert_eq!(extraction.capacity.len(), 2);
    assert_eq!(extraction.capacity[1].capacity.as_number(), Some(10.0));
}

#[test]
fn missing_header_is_schema_error() {
    let mut data = data_sheet();
    data.set(21, 4, "Owner");

    let err = extract(&data, &capacity_sheet()).unwrap_err();
    assert_eq!(
        err,
        ExtractError::Schema(SchemaError::MissingColumn {
            sheet: "Data".into(),
            column: "Assigned To",
            row: 21,
        })
    );
}

#[test]
fn metadata_is_checked_before_the_table() {
    let mut data = data_sheet();
    data.clear(6, 1);
    data.set(21, 4, "Owner");

    let err = extract(&data, &capacity_sheet()).unwrap_err();
    assert_eq!(err, ExtractError::Metadata(MetadataError::Missing { field: "End Date" }));
}

#[test]
fn extract_error_converts_to_process_error() {
    let mut data = data_sheet();
    data.clear(3, 1);

    let err: ProcessError = extract(&data, &capacity_sheet()).unwrap_err().into();
    assert!(matches!(err, ProcessError::Metadata(MetadataError::Missing { field: "Sprint Name" })));
}
