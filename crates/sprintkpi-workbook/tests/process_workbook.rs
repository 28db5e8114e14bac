//! End-to-end runs over real `.xlsx` files
//!
//! Fixtures are produced with rust_xlsxwriter so that reading goes through
//! a file written by an independent implementation.

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_xlsxwriter::{ExcelDateTime, Format, Formula, Workbook, Worksheet};
use sprintkpi_core::{
    AnalysisConfig, CellSource, CellValue, IssueCode, ProcessError, ValidationStatus, WorkbookStructureError,
    CMMI_SHEET, KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET,
};
use sprintkpi_parser::extract;
use sprintkpi_workbook::{check, process, run, MemoryWorkbook, WorkbookStore, XlsxWorkbook};

const TARGETS: [&str; 4] = [KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET, CMMI_SHEET];

const ITEM_HEADERS: [&str; 7] = ["ID", "Work Item Type", "State", "Assigned To", "Effort", "Team", "Created Date"];

struct Item {
    id: f64,
    kind: &'static str,
    state: &'static str,
    assignee: &'static str,
    effort: f64,
    team: &'static str,
    created: &'static str,
}

fn item(id: u32, state: &'static str, assignee: &'static str, effort: f64) -> Item {
    Item {
        id: id as f64,
        kind: "Task",
        state,
        assignee,
        effort,
        team: "Core",
        created: "2025-03-01",
    }
}

fn sprint_items() -> Vec<Item> {
    vec![
        item(1, "Done", "Maria", 2.0),
        item(2, "Active", "Maria", 1.5),
        Item {
            kind: "Bug",
            created: "2025-03-05",
            ..item(3, "Done", "Luca", 1.0)
        },
    ]
}

fn write_data(sheet: &mut Worksheet, sprint: &str, items: &[Item]) {
    sheet.set_name("Data").unwrap();
    sheet.write_string(0, 0, "Sprint Tracking").unwrap();
    sheet.write_string(2, 0, "Sprint Name").unwrap();
    sheet.write_string(2, 1, sprint).unwrap();
    sheet.write_string(3, 0, "Sprint Number").unwrap();
    sheet.write_number(3, 1, 5).unwrap();
    sheet.write_string(4, 0, "Start Date").unwrap();
    sheet.write_string(4, 1, "2025-03-03").unwrap();
    sheet.write_string(5, 0, "End Date").unwrap();
    sheet.write_string(5, 1, "2025-03-14").unwrap();

    for (col, header) in ITEM_HEADERS.iter().enumerate() {
        sheet.write_string(20, col as u16, *header).unwrap();
    }
    for (offset, item) in items.iter().enumerate() {
        let row = 21 + offset as u32;
        sheet.write_number(row, 0, item.id).unwrap();
        sheet.write_string(row, 1, item.kind).unwrap();
        sheet.write_string(row, 2, item.state).unwrap();
        sheet.write_string(row, 3, item.assignee).unwrap();
        sheet.write_number(row, 4, item.effort).unwrap();
        sheet.write_string(row, 5, item.team).unwrap();
        sheet.write_string(row, 6, item.created).unwrap();
    }
}

fn write_capacity(sheet: &mut Worksheet) {
    sheet.set_name("Capacity").unwrap();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Capacity").unwrap();
    sheet.write_string(0, 2, "Team").unwrap();
    sheet.write_string(1, 0, "Maria").unwrap();
    sheet.write_number(1, 1, 5).unwrap();
    sheet.write_string(1, 2, "Core").unwrap();
    sheet.write_string(2, 0, "Luca").unwrap();
    sheet.write_number(2, 1, 4).unwrap();
    sheet.write_string(2, 2, "Core").unwrap();
}

/// A workbook with inputs, the four target sheets and one unrelated sheet
fn fixture_with(sprint: &str, items: &[Item], targets: &[&str]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    write_data(workbook.add_worksheet(), sprint, items);
    write_capacity(workbook.add_worksheet());
    for name in targets {
        workbook.add_worksheet().set_name(*name).unwrap();
    }
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "Retro actions").unwrap();
    notes.write_number(1, 1, 3).unwrap();
    workbook.save_to_buffer().unwrap()
}

fn fixture() -> Vec<u8> {
    fixture_with("Sprint 5", &sprint_items(), &TARGETS)
}

/// The default fixture with `edit` applied to the Data and Capacity sheets
fn edited_fixture(edit: impl FnOnce(&mut Worksheet, &mut Worksheet)) -> Vec<u8> {
    let mut data = Worksheet::new();
    write_data(&mut data, "Sprint 5", &sprint_items());
    let mut capacity = Worksheet::new();
    write_capacity(&mut capacity);
    edit(&mut data, &mut capacity);

    let mut workbook = Workbook::new();
    workbook.push_worksheet(data);
    workbook.push_worksheet(capacity);
    for name in TARGETS {
        workbook.add_worksheet().set_name(name).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn sheet(bytes: &[u8], name: &str) -> sprintkpi_core::Grid {
    XlsxWorkbook::from_bytes(bytes).unwrap().read_sheet(name).unwrap()
}

#[test]
fn process_writes_every_target_sheet() {
    let output = process(&fixture(), &AnalysisConfig::default()).unwrap();

    assert_eq!(output.analysis_sheet, "Sprint 5 Analysis");
    assert_eq!(output.validation.status, ValidationStatus::Ok);
    assert_eq!(output.staff_metrics.len(), 2);
    assert_eq!(output.team_metrics.len(), 1);
    assert!((output.cmmi.completion_rate - 2.0 / 3.0).abs() < 1e-9);

    let book = XlsxWorkbook::from_bytes(&output.workbook).unwrap();
    assert!(book.has_sheet("Sprint 5 Analysis"));

    let analysis = book.read_sheet("Sprint 5 Analysis").unwrap();
    assert_eq!(analysis.cell(6, 1), CellValue::text("Luca"));
    assert_eq!(analysis.cell(7, 1), CellValue::text("Maria"));
    assert_eq!(analysis.cell(7, 8), CellValue::Number(3.5));

    let indicators = book.read_sheet(KPI_INDICATORS_SHEET).unwrap();
    assert_eq!(indicators.cell(4, 4), CellValue::formula("'Sprint 5 Analysis'!P6"));

    let staff = book.read_sheet(STAFF_HISTORY_SHEET).unwrap();
    assert_eq!(staff.cell(1, 3), CellValue::text("Sprint 5"));
    assert_eq!(staff.cell(2, 1), CellValue::text("Luca"));
    assert_eq!(staff.cell(2, 3), CellValue::formula("'Sprint 5 Analysis'!P6"));

    let team = book.read_sheet(TEAM_HISTORY_SHEET).unwrap();
    assert_eq!(team.cell(1, 1), CellValue::text("Team"));
    assert_eq!(team.cell(2, 1), CellValue::text("Core"));

    let cmmi = book.read_sheet(CMMI_SHEET).unwrap();
    assert_eq!(cmmi.cell(2, 1), CellValue::text("Sprint 5"));
    assert!(matches!(cmmi.cell(2, 2), CellValue::Formula(_)));

    let summary = output.summary();
    assert_eq!(summary.staff_analyzed, 2);
    assert_eq!(summary.teams_processed, 1);
}

#[test]
fn formula_inputs_count_with_their_cached_results() {
    let input = edited_fixture(|data, capacity| {
        data.write_formula(21, 4, Formula::new("=1+1").set_result("2")).unwrap();
        capacity.write_formula(1, 1, Formula::new("=10*0.5").set_result("5")).unwrap();
    });
    let config = AnalysisConfig::default();

    let output = process(&input, &config).unwrap();
    let literal = process(&fixture(), &config).unwrap();

    assert_eq!(output.validation.status, ValidationStatus::Ok);
    assert_eq!(output.staff_metrics, literal.staff_metrics);
    assert_eq!(output.team_metrics, literal.team_metrics);
    assert_eq!(output.cmmi, literal.cmmi);

    let maria = output.staff_metrics.iter().find(|m| m.name == "Maria").unwrap();
    assert_eq!(maria.capacity, Some(5.0));
    assert!(maria.flags.is_empty(), "flags: {:?}", maria.flags);

    assert_eq!(check(&input, &config).unwrap().validation.status, ValidationStatus::Ok);

    // the input formulas themselves are written back unchanged
    let data = sheet(&output.workbook, "Data");
    assert_eq!(data.cell(22, 5), CellValue::formula("1+1"));
    let capacity = sheet(&output.workbook, "Capacity");
    assert_eq!(capacity.cell(2, 2), CellValue::formula("10*0.5"));
}

#[test]
fn date_formatted_cells_read_as_dates() {
    let date = |day: u8| ExcelDateTime::from_ymd(2025, 3, day).unwrap();
    let input = edited_fixture(|data, _| {
        let format = Format::new().set_num_format("dd/mm/yyyy");
        data.write_datetime_with_format(4, 1, date(3), &format).unwrap();
        data.write_datetime_with_format(5, 1, date(14), &format).unwrap();
        for (offset, day) in [1, 1, 5].into_iter().enumerate() {
            data.write_datetime_with_format(21 + offset as u32, 6, date(day), &format)
                .unwrap();
        }
    });
    let config = AnalysisConfig::default();

    let output = process(&input, &config).unwrap();
    let literal = process(&fixture(), &config).unwrap();

    assert_eq!(output.metadata.start_date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    assert_eq!(output.metadata.end_date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
    assert_eq!(output.validation.status, ValidationStatus::Ok);
    // Luca's item created on 2025-03-05 is still a mid-sprint addition
    assert_eq!(output.staff_metrics, literal.staff_metrics);
    let luca = output.staff_metrics.iter().find(|m| m.name == "Luca").unwrap();
    assert_eq!(luca.tally.additions, 1);
}

#[test]
fn same_sprint_twice_keeps_one_column() {
    let config = AnalysisConfig::default();
    let first = process(&fixture(), &config).unwrap();
    let second = process(&first.workbook, &config).unwrap();

    for name in [STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET] {
        let before = sheet(&first.workbook, name);
        let after = sheet(&second.workbook, name);
        assert_eq!(after.max_col(), 3, "{name}");
        assert_eq!(before, after, "{name}");
    }

    let cmmi = sheet(&second.workbook, CMMI_SHEET);
    let rows: Vec<u32> = (2..=cmmi.max_row())
        .filter(|&row| cmmi.cell(row, 1) == CellValue::text("Sprint 5"))
        .collect();
    assert_eq!(rows, vec![2]);
}

#[test]
fn next_sprint_appends_a_column() {
    let config = AnalysisConfig::default();
    let first = process(&fixture(), &config).unwrap();

    // Carry the history sheets into the next sprint's workbook
    let mut next = XlsxWorkbook::from_bytes(&fixture_with(
        "Sprint 6",
        &sprint_items(),
        &[KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET, CMMI_SHEET],
    ))
    .unwrap();
    for name in [STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET, CMMI_SHEET] {
        next.write_sheet(&sheet(&first.workbook, name)).unwrap();
    }
    let second = process(&next.to_bytes().unwrap(), &config).unwrap();

    let staff = sheet(&second.workbook, STAFF_HISTORY_SHEET);
    assert_eq!(staff.cell(1, 3), CellValue::text("Sprint 5"));
    assert_eq!(staff.cell(1, 4), CellValue::text("Sprint 6"));
    assert_eq!(staff.cell(2, 3), CellValue::formula("'Sprint 5 Analysis'!P6"));
    assert_eq!(staff.cell(2, 4), CellValue::formula("'Sprint 6 Analysis'!P6"));

    let cmmi = sheet(&second.workbook, CMMI_SHEET);
    assert_eq!(cmmi.cell(2, 1), CellValue::text("Sprint 5"));
    assert_eq!(cmmi.cell(3, 1), CellValue::text("Sprint 6"));
}

#[test]
fn unrelated_sheets_are_untouched() {
    let input = fixture();
    let output = process(&input, &AnalysisConfig::default()).unwrap();

    for name in ["Notes", "Data", "Capacity"] {
        assert_eq!(sheet(&input, name), sheet(&output.workbook, name), "{name}");
    }
}

#[test]
fn empty_table_fails_without_output() {
    let input = fixture_with(
        "Sprint 5",
        &[],
        &[KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET, CMMI_SHEET],
    );

    let err = process(&input, &AnalysisConfig::default()).unwrap_err();
    let validation = err.validation().expect("data error");
    assert_eq!(validation.status, ValidationStatus::Error);
    assert_eq!(validation.issues[0].code, IssueCode::E001EmptyTable);
}

#[test]
fn missing_target_sheet_fails() {
    let input = fixture_with(
        "Sprint 5",
        &sprint_items(),
        &[KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET],
    );

    let err = process(&input, &AnalysisConfig::default()).unwrap_err();
    assert!(
        matches!(
            &err,
            ProcessError::WorkbookStructure(WorkbookStructureError::MissingSheet(name)) if name == CMMI_SHEET
        ),
        "got {err:?}"
    );
}

#[test]
fn xlsx_view_and_grid_extract_the_same_rows() {
    let book = XlsxWorkbook::from_bytes(&fixture()).unwrap();

    let from_views = extract(&book.view("Data").unwrap(), &book.view("Capacity").unwrap()).unwrap();
    let from_grids = extract(&book.read_sheet("Data").unwrap(), &book.read_sheet("Capacity").unwrap()).unwrap();

    assert_eq!(from_views, from_grids);
    assert_eq!(from_views.items.len(), 3);
}

#[test]
fn memory_store_runs_are_idempotent() {
    let book = XlsxWorkbook::from_bytes(&fixture()).unwrap();
    let mut store = MemoryWorkbook::new();
    for name in book.sheet_names() {
        store = store.with_sheet(book.read_sheet(&name).unwrap());
    }
    let config = AnalysisConfig::default();

    let first = run(&mut store, &config).unwrap();
    let after_first = store.clone();
    let second = run(&mut store, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, store);
    assert!(store.sheet_names().contains(&"Sprint 5 Analysis".to_string()));
}

#[test]
fn check_reports_without_writing() {
    let items = vec![item(1, "Done", "Maria", 2.0), item(2, "Active", "", 1.0)];
    let input = fixture_with("Sprint 5", &items, &[]);

    let report = check(&input, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.metadata.sprint_name, "Sprint 5");
    assert_eq!(report.validation.status, ValidationStatus::Warning);
    assert!(report
        .validation
        .issues
        .iter()
        .any(|issue| issue.code == IssueCode::W001MissingAssignee));
}
