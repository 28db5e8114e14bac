//! Per-sprint analysis sheet
//!
//! ```text
//! row 1   | Sprint 5 Analysis
//! row 2   | Sprint | Sprint 5 | Sprint Number | 5 | Start Date | 2025-03-03 | End Date | 2025-03-14
//! row 3   | Validation | warning | Issues | 2
//! row 5   | Staff | Team | Total Tasks | Done Tasks | ... | Capacity | Done Tasks % | ... | KPI | Flags
//! row 6.. | one row per staff member
//!         | (blank)
//!         | Team | Members | Total Tasks | ...            (same columns)
//!         | one row per team
//!         | (blank)
//!         | CMMI Measures | Value
//!         | raw sprint totals, then the five measures
//! ```
//!
//! Counts, sums and capacities are literals. Every ratio and KPI cell is a
//! formula over its own row, so editing a raw number recomputes the row.

use std::collections::BTreeMap;

use sprintkpi_core::{
    AnalysisConfig, CellRef, CellValue, CmmiMeasure, CmmiMeasures, EntityMetrics, Grid, Kpi, SprintMetadata,
    TeamAggregate, ValidationResult,
};
use sprintkpi_metrics::calculate::PERFORMANCE_RATE_CEILING;

use crate::formula::Formula;

/// Header row of the staff table
pub const STAFF_HEADER_ROW: u32 = 5;

pub const COL_NAME: u32 = 1;
pub const COL_GROUP: u32 = 2;
pub const COL_TOTAL_TASKS: u32 = 3;
pub const COL_DONE_TASKS: u32 = 4;
pub const COL_ADDITIONS: u32 = 5;
pub const COL_ADHOC: u32 = 6;
pub const COL_UNPLANNED: u32 = 7;
pub const COL_TOTAL_EFFORT: u32 = 8;
pub const COL_DONE_EFFORT: u32 = 9;
pub const COL_CAPACITY: u32 = 10;
pub const COL_FLAGS: u32 = 17;

/// Column of a KPI in the staff and team tables
pub fn kpi_column(kpi: Kpi) -> u32 {
    match kpi {
        Kpi::DoneTasks => 11,
        Kpi::MidSprintAddition => 12,
        Kpi::AdHoc => 13,
        Kpi::Utilization => 14,
        Kpi::PerformanceRate => 15,
        Kpi::Kpi => 16,
    }
}

const RAW_HEADERS: [&str; 8] = [
    "Total Tasks",
    "Done Tasks",
    "MidSprint Additions",
    "Ad-hoc Tasks",
    "Unplanned Tasks",
    "Total Effort",
    "Done Effort",
    "Capacity",
];

/// Sprint totals listed above the CMMI measures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CmmiTotal {
    TotalTasks,
    DoneTasks,
    EstimatedEffort,
    ActualEffort,
    BugEffort,
    DoneEffort,
    TotalCapacity,
}

impl CmmiTotal {
    const ALL: [CmmiTotal; 7] = [
        CmmiTotal::TotalTasks,
        CmmiTotal::DoneTasks,
        CmmiTotal::EstimatedEffort,
        CmmiTotal::ActualEffort,
        CmmiTotal::BugEffort,
        CmmiTotal::DoneEffort,
        CmmiTotal::TotalCapacity,
    ];

    fn label(self) -> &'static str {
        match self {
            CmmiTotal::TotalTasks => "Total Tasks",
            CmmiTotal::DoneTasks => "Done Tasks",
            CmmiTotal::EstimatedEffort => "Estimated Effort",
            CmmiTotal::ActualEffort => "Actual Effort",
            CmmiTotal::BugEffort => "Bug Fixing Effort",
            CmmiTotal::DoneEffort => "Done Effort",
            CmmiTotal::TotalCapacity => "Total Capacity",
        }
    }

    fn value(self, cmmi: &CmmiMeasures) -> f64 {
        let t = &cmmi.totals;
        match self {
            CmmiTotal::TotalTasks => t.total_tasks as f64,
            CmmiTotal::DoneTasks => t.done_tasks as f64,
            CmmiTotal::EstimatedEffort => t.estimated_effort,
            CmmiTotal::ActualEffort => t.actual_effort,
            CmmiTotal::BugEffort => t.bug_effort,
            CmmiTotal::DoneEffort => t.done_effort,
            CmmiTotal::TotalCapacity => t.total_capacity,
        }
    }
}

/// Where things landed on the analysis sheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisLayout {
    /// Row of each staff member, in table order
    pub staff_rows: Vec<(String, u32)>,
    /// Row of each team, in table order
    pub team_rows: Vec<(String, u32)>,
    /// Value cell of each CMMI measure
    pub cmmi_cells: BTreeMap<CmmiMeasure, CellRef>,
}

impl AnalysisLayout {
    /// Cell holding `kpi` for the entity on `row`
    pub fn kpi_cell(row: u32, kpi: Kpi) -> CellRef {
        CellRef::new(row, kpi_column(kpi))
    }
}

/// Everything the analysis sheet is built from
pub struct AnalysisInputs<'a> {
    pub metadata: &'a SprintMetadata,
    pub staff: &'a [EntityMetrics],
    pub teams: &'a [EntityMetrics],
    /// Team rollups, for the member list
    pub team_aggregates: &'a [TeamAggregate],
    pub cmmi: &'a CmmiMeasures,
    pub validation: &'a ValidationResult,
    pub config: &'a AnalysisConfig,
}

/// Build the analysis sheet from scratch
pub fn build_analysis_sheet(name: &str, inputs: &AnalysisInputs<'_>) -> (Grid, AnalysisLayout) {
    let mut grid = Grid::new(name);
    let mut layout = AnalysisLayout::default();
    let meta = inputs.metadata;

    grid.set(1, 1, name);
    grid.set_row(
        2,
        1,
        [
            CellValue::text("Sprint"),
            CellValue::text(meta.sprint_name.as_str()),
            CellValue::text("Sprint Number"),
            CellValue::from(meta.sprint_number),
            CellValue::text("Start Date"),
            CellValue::text(meta.start_date.format("%Y-%m-%d").to_string()),
            CellValue::text("End Date"),
            CellValue::text(meta.end_date.format("%Y-%m-%d").to_string()),
        ],
    );
    grid.set_row(
        3,
        1,
        [
            CellValue::text("Validation"),
            CellValue::text(inputs.validation.status.as_str()),
            CellValue::text("Issues"),
            CellValue::from(inputs.validation.issues.len() as u32),
        ],
    );

    let mut row = STAFF_HEADER_ROW;
    write_table_header(&mut grid, row, "Staff", "Team");
    for staff in inputs.staff {
        row += 1;
        let team = staff.team.clone().unwrap_or_default();
        write_entity_row(&mut grid, row, staff, &team, inputs.config);
        layout.staff_rows.push((staff.name.clone(), row));
    }

    row += 2;
    write_table_header(&mut grid, row, "Team", "Members");
    for team in inputs.teams {
        row += 1;
        let members = inputs
            .team_aggregates
            .iter()
            .find(|t| t.name == team.name)
            .map(|t| t.members.join(", "))
            .unwrap_or_default();
        write_entity_row(&mut grid, row, team, &members, inputs.config);
        layout.team_rows.push((team.name.clone(), row));
    }

    row += 2;
    grid.set_row(row, 1, ["CMMI Measures", "Value"]);

    let first_total_row = row + 1;
    for total in CmmiTotal::ALL {
        row += 1;
        grid.set(row, 1, total.label());
        grid.set(row, 2, total.value(inputs.cmmi));
    }

    for measure in CmmiMeasure::ALL {
        row += 1;
        let formula = cmmi_formula(measure, first_total_row);
        grid.set(row, 1, measure.label());
        grid.set(row, 2, formula);
        let flags: Vec<String> = inputs
            .cmmi
            .flags
            .iter()
            .filter(|f| f.metric == measure)
            .map(|f| f.reason.as_str().to_string())
            .collect();
        if !flags.is_empty() {
            grid.set(row, 3, flags.join("; "));
        }
        layout.cmmi_cells.insert(measure, CellRef::new(row, 2));
    }

    (grid, layout)
}

fn write_table_header(grid: &mut Grid, row: u32, name: &str, group: &str) {
    grid.set(row, COL_NAME, name);
    grid.set(row, COL_GROUP, group);
    grid.set_row(row, COL_TOTAL_TASKS, RAW_HEADERS);
    for kpi in Kpi::ALL {
        grid.set(row, kpi_column(kpi), kpi.label());
    }
    grid.set(row, COL_FLAGS, "Flags");
}

fn write_entity_row(grid: &mut Grid, row: u32, metrics: &EntityMetrics, group: &str, config: &AnalysisConfig) {
    let t = &metrics.tally;
    let at = |col: u32| CellRef::new(row, col);

    grid.set(row, COL_NAME, metrics.name.as_str());
    if !group.is_empty() {
        grid.set(row, COL_GROUP, group);
    }
    grid.set(row, COL_TOTAL_TASKS, t.total_tasks);
    grid.set(row, COL_DONE_TASKS, t.done_tasks);
    grid.set(row, COL_ADDITIONS, t.additions);
    grid.set(row, COL_ADHOC, t.adhoc);
    grid.set(row, COL_UNPLANNED, t.unplanned);
    grid.set(row, COL_TOTAL_EFFORT, t.total_effort);
    grid.set(row, COL_DONE_EFFORT, t.done_effort);
    if let Some(capacity) = metrics.capacity {
        grid.set(row, COL_CAPACITY, capacity);
    }

    let total = at(COL_TOTAL_TASKS);
    let capacity = at(COL_CAPACITY);
    grid.set(row, kpi_column(Kpi::DoneTasks), Formula::ratio(at(COL_DONE_TASKS), total));
    grid.set(row, kpi_column(Kpi::MidSprintAddition), Formula::ratio(at(COL_ADDITIONS), total));
    grid.set(row, kpi_column(Kpi::AdHoc), Formula::ratio(at(COL_ADHOC), total));
    grid.set(
        row,
        kpi_column(Kpi::Utilization),
        Formula::capped_ratio(at(COL_TOTAL_EFFORT), capacity, config.utilization_ceiling),
    );
    grid.set(
        row,
        kpi_column(Kpi::PerformanceRate),
        Formula::capped_ratio(at(COL_DONE_EFFORT), capacity, PERFORMANCE_RATE_CEILING),
    );
    grid.set(
        row,
        kpi_column(Kpi::Kpi),
        Formula::kpi(
            &config.weights,
            at(kpi_column(Kpi::DoneTasks)),
            at(kpi_column(Kpi::Utilization)),
            at(kpi_column(Kpi::PerformanceRate)),
            at(COL_UNPLANNED),
            total,
        ),
    );

    if !metrics.flags.is_empty() {
        let flags: Vec<String> = metrics.flags.iter().map(|f| f.to_string()).collect();
        grid.set(row, COL_FLAGS, flags.join("; "));
    }
}

/// `first_total_row` is the row of the first sprint total; the others follow in order
fn cmmi_formula(measure: CmmiMeasure, first_total_row: u32) -> Formula {
    let cell = |total: CmmiTotal| CellRef::new(first_total_row + total as u32, 2);
    match measure {
        CmmiMeasure::CompletionRate => Formula::ratio(cell(CmmiTotal::DoneTasks), cell(CmmiTotal::TotalTasks)),
        CmmiMeasure::EffortEstimationAccuracy => {
            Formula::estimation_accuracy(cell(CmmiTotal::EstimatedEffort), cell(CmmiTotal::ActualEffort))
        }
        CmmiMeasure::BugFixingEffort => Formula::ratio(cell(CmmiTotal::BugEffort), cell(CmmiTotal::ActualEffort)),
        CmmiMeasure::UtilizationRate => {
            Formula::ratio(cell(CmmiTotal::ActualEffort), cell(CmmiTotal::TotalCapacity))
        }
        CmmiMeasure::Productivity => Formula::ratio(cell(CmmiTotal::DoneEffort), cell(CmmiTotal::TotalCapacity)),
    }
}
