//! End-to-end scenarios from extracted sheets to metrics
//!
//! Sheets are built as in-memory grids, run through the extractor, then
//! validated and analyzed.

use sprintkpi_core::{AnalysisConfig, FlagReason, Grid, Kpi, MetricFlag, ValidationStatus};
use sprintkpi_metrics::{analyze, validate};
use sprintkpi_parser::extract;

fn data_sheet(rows: &[[&str; 7]]) -> Grid {
    let mut data = Grid::new("Data");
    data.set_row(3, 1, ["Sprint Name", "Sprint 5"]);
    data.set_row(4, 1, ["Sprint Number", "5"]);
    data.set_row(5, 1, ["Start Date", "2025-03-03"]);
    data.set_row(6, 1, ["End Date", "2025-03-14"]);
    data.set_row(
        21,
        1,
        ["ID", "Work Item Type", "State", "Assigned To", "Effort", "Team", "Created Date"],
    );
    for (offset, row) in rows.iter().enumerate() {
        data.set_row(22 + offset as u32, 1, *row);
    }
    data
}

fn capacity_sheet(rows: &[[&str; 3]]) -> Grid {
    let mut capacity = Grid::new("Capacity");
    capacity.set_row(1, 1, ["Name", "Capacity", "Team"]);
    for (offset, row) in rows.iter().enumerate() {
        capacity.set_row(2 + offset as u32, 1, *row);
    }
    capacity
}

/// Ten items for one person: two done, one added mid-sprint, total effort 4
fn ten_item_rows() -> Vec<[&'static str; 7]> {
    vec![
        ["1", "Task", "Done", "Maria", "0.5", "Core", "2025-03-01"],
        ["2", "Task", "Done", "Maria", "0.5", "Core", "2025-03-01"],
        ["3", "Task", "Active", "Maria", "0.5", "Core", "2025-03-01"],
        ["4", "Task", "Active", "Maria", "0.5", "Core", "2025-03-01"],
        ["5", "Task", "Active", "Maria", "0.5", "Core", "2025-03-01"],
        ["6", "Task", "New", "Maria", "0.5", "Core", "2025-03-01"],
        ["7", "Task", "New", "Maria", "0.25", "Core", "2025-03-01"],
        ["8", "Task", "New", "Maria", "0.25", "Core", "2025-03-01"],
        ["9", "Task", "New", "Maria", "0.25", "Core", "2025-03-01"],
        ["10", "Bug", "New", "Maria", "0.25", "Core", "2025-03-06"],
    ]
}

#[test]
fn ten_items_two_done_one_addition() {
    let extraction = extract(&data_sheet(&ten_item_rows()), &capacity_sheet(&[["Maria", "5", "Core"]])).unwrap();
    let config = AnalysisConfig::default();

    let validated = validate(&extraction.items, &extraction.capacity, &extraction.metadata, &config);
    assert_eq!(validated.result.status, ValidationStatus::Ok);

    let dataset = validated.dataset.expect("dataset when not in error");
    let analysis = analyze(&dataset, &extraction.metadata, &config);

    let maria = &analysis.staff_metrics[0];
    assert_eq!(maria.tally.total_tasks, 10);
    assert_eq!(maria.tally.additions, 1);
    assert_eq!(maria.tally.adhoc, 0);
    assert!((maria.values.done_tasks - 0.2).abs() < 1e-9);
    assert!((maria.values.utilization - 0.8).abs() < 1e-9);
    assert!((maria.values.midsprint_addition - 0.1).abs() < 1e-9);
    assert_eq!(maria.values.adhoc, 0.0);
    assert!(maria.flags.is_empty());

    let core = &analysis.team_metrics[0];
    assert_eq!(core.name, "Core");
    assert_eq!(core.capacity, Some(5.0));
    assert!((core.values.utilization - 0.8).abs() < 1e-9);
}

#[test]
fn empty_table_stops_before_metrics() {
    let extraction = extract(&data_sheet(&[]), &capacity_sheet(&[["Maria", "5", "Core"]])).unwrap();
    let validated = validate(
        &extraction.items,
        &extraction.capacity,
        &extraction.metadata,
        &AnalysisConfig::default(),
    );

    assert_eq!(validated.result.status, ValidationStatus::Error);
    assert!(validated.dataset.is_none());
}

#[test]
fn team_effort_is_conserved() {
    let rows = [
        ["1", "Task", "Done", "Maria", "3", "Core", ""],
        ["2", "Task", "Active", "Luca", "2", "Core", ""],
        ["3", "Task", "Active", "", "4", "Core", ""],
        ["4", "Bug", "Done", "Luca", "", "Platform", ""],
        ["5", "Bug", "Done", "Luca", "1.5", "Platform", ""],
        ["6", "Task", "New", "Anna", "2", "", ""],
    ];
    let extraction = extract(&data_sheet(&rows), &capacity_sheet(&[["Maria", "8", "Core"], ["Luca", "6", ""]])).unwrap();
    let config = AnalysisConfig::default();
    let validated = validate(&extraction.items, &extraction.capacity, &extraction.metadata, &config);
    assert_eq!(validated.result.status, ValidationStatus::Warning);

    let analysis = analyze(validated.dataset.as_ref().unwrap(), &extraction.metadata, &config);
    for team in &analysis.aggregates.teams {
        let staff_effort: f64 = analysis
            .aggregates
            .staff
            .iter()
            .filter_map(|s| s.effort_by_team.get(&team.key))
            .sum();
        assert!(
            (staff_effort + team.unassigned_effort - team.tally.total_effort).abs() < 1e-9,
            "team {} total {} vs staff {} + unassigned {}",
            team.name,
            team.tally.total_effort,
            staff_effort,
            team.unassigned_effort
        );
    }
}

#[test]
fn unknown_capacity_is_flagged_not_fatal() {
    let rows = [["1", "Task", "Done", "Ghost", "3", "", ""]];
    let extraction = extract(&data_sheet(&rows), &capacity_sheet(&[])).unwrap();
    let config = AnalysisConfig::default();
    let validated = validate(&extraction.items, &extraction.capacity, &extraction.metadata, &config);

    assert_eq!(validated.result.status, ValidationStatus::Warning);
    let analysis = analyze(validated.dataset.as_ref().unwrap(), &extraction.metadata, &config);
    let ghost = &analysis.staff_metrics[0];
    assert!(ghost.flags.contains(&MetricFlag {
        metric: Kpi::Utilization,
        reason: FlagReason::UnknownCapacity
    }));
    assert_eq!(analysis.cmmi.utilization_rate, 0.0);
    assert!(analysis.team_metrics.is_empty());
    assert_eq!(analysis.average_team_kpi(), 0.0);
}

#[test]
fn same_input_same_result() {
    let extraction = extract(&data_sheet(&ten_item_rows()), &capacity_sheet(&[["Maria", "5", "Core"]])).unwrap();
    let config = AnalysisConfig::default();

    let first = validate(&extraction.items, &extraction.capacity, &extraction.metadata, &config);
    let second = validate(&extraction.items, &extraction.capacity, &extraction.metadata, &config);
    assert_eq!(first, second);

    let dataset = first.dataset.unwrap();
    assert_eq!(
        analyze(&dataset, &extraction.metadata, &config),
        analyze(&dataset, &extraction.metadata, &config)
    );
}
