//! # sprintkpi-core
//!
//! Core domain model and traits for the sprintkpi engine.
//!
//! This crate provides:
//! - Domain types: `SprintMetadata`, `WorkItem`, `CapacityRecord`, aggregates and metrics
//! - The cell model shared by extraction and workbook updates (`CellValue`, `Grid`, `CellSource`)
//! - Validation results (`ValidationResult`, `Issue`)
//! - Analysis configuration (`AnalysisConfig`)
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use sprintkpi_core::{Kpi, KpiValues};
//!
//! let values = KpiValues {
//!     done_tasks: 0.2,
//!     midsprint_addition: 0.1,
//!     adhoc: 0.0,
//!     utilization: 0.8,
//!     performance_rate: 0.3,
//!     kpi: 0.5,
//! };
//! assert_eq!(values.get(Kpi::Utilization), 0.8);
//! assert_eq!(Kpi::DoneTasks.label(), "Done Tasks %");
//! ```

pub mod cell;
pub mod config;
pub mod validation;

pub use cell::{column_letter, date_to_excel_serial, excel_serial_to_date, CellRef, CellSource, CellValue, Grid};
pub use config::{AnalysisConfig, KpiWeights};
pub use validation::{Issue, IssueCode, Severity, ValidationResult, ValidationStatus};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// ============================================================================
// Sheet Names
// ============================================================================

/// Input sheet holding sprint metadata and the Azure DevOps export
pub const DATA_SHEET: &str = "Data";

/// Input sheet mapping staff to sprint capacity
pub const CAPACITY_SHEET: &str = "Capacity";

/// Current-sprint KPI view
pub const KPI_INDICATORS_SHEET: &str = "Kpi Indicators";

/// Per-staff KPI history, one column per sprint
pub const STAFF_HISTORY_SHEET: &str = "Kpi Indicators Per Staff";

/// Per-team KPI history, one column per sprint
pub const TEAM_HISTORY_SHEET: &str = "Kpi Indicators Per Team";

/// CMMI measures history, one row per sprint
pub const CMMI_SHEET: &str = "CMMI Template";

/// Normalize a staff or team name into a grouping key.
///
/// Trims, collapses inner whitespace and lowercases.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Sprint Metadata
// ============================================================================

/// Header information read from the Data sheet
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SprintMetadata {
    /// Sprint name, used as sheet-name prefix and history key
    pub sprint_name: String,
    /// Sprint sequence number
    pub sprint_number: u32,
    /// First day of the sprint
    pub start_date: NaiveDate,
    /// Last day of the sprint
    pub end_date: NaiveDate,
    /// Teams taking part in the sprint (may be empty)
    pub teams: Vec<String>,
    /// Planned effort for the sprint, fallback estimate for CMMI accuracy
    pub planned_effort: Option<f64>,
}

impl SprintMetadata {
    /// Sprint length in calendar days, both ends included
    pub fn length_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

// ============================================================================
// Raw Rows (extractor output, validator input)
// ============================================================================

/// Columns of the Azure DevOps work item table
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Id,
    WorkItemType,
    State,
    AssignedTo,
    Effort,
    Title,
    Team,
    OriginalEstimate,
    CreatedDate,
    ClosedDate,
    Addition,
    Category,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::Id,
        Column::WorkItemType,
        Column::State,
        Column::AssignedTo,
        Column::Effort,
        Column::Title,
        Column::Team,
        Column::OriginalEstimate,
        Column::CreatedDate,
        Column::ClosedDate,
        Column::Addition,
        Column::Category,
    ];

    /// Canonical header label
    pub fn label(&self) -> &'static str {
        match self {
            Column::Id => "ID",
            Column::WorkItemType => "Work Item Type",
            Column::State => "State",
            Column::AssignedTo => "Assigned To",
            Column::Effort => "Effort",
            Column::Title => "Title",
            Column::Team => "Team",
            Column::OriginalEstimate => "Original Estimate",
            Column::CreatedDate => "Created Date",
            Column::ClosedDate => "Closed Date",
            Column::Addition => "Addition",
            Column::Category => "Category",
        }
    }

    /// Whether the header must be present for the table to be usable
    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Column::Id | Column::WorkItemType | Column::State | Column::AssignedTo | Column::Effort
        )
    }
}

/// One data row of the work item table, keyed by column.
///
/// Every column present in the header row has an entry, blank cells
/// included, so `has_column` tells whether a column exists at all.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorkItem {
    /// 1-based row in the Data sheet
    pub row: u32,
    pub cells: BTreeMap<Column, CellValue>,
}

impl RawWorkItem {
    pub fn new(row: u32) -> Self {
        Self {
            row,
            cells: BTreeMap::new(),
        }
    }

    /// Set a column value (builder pattern)
    pub fn with(mut self, column: Column, value: impl Into<CellValue>) -> Self {
        self.cells.insert(column, value.into());
        self
    }

    /// Value of a column; `Empty` when the column is absent
    pub fn get(&self, column: Column) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&column).unwrap_or(&EMPTY)
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.cells.contains_key(&column)
    }
}

/// One data row of the Capacity sheet
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCapacityRow {
    /// 1-based row in the Capacity sheet
    pub row: u32,
    pub name: CellValue,
    pub capacity: CellValue,
    pub team: CellValue,
}

// ============================================================================
// Work Items & Capacity
// ============================================================================

/// Planned vs unplanned classification of a work item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Planned,
    AdHoc,
}

/// One validated row of the Azure DevOps export
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Azure DevOps work item id
    pub id: u64,
    pub title: String,
    /// Work item type (Task, Bug, User Story, ...)
    pub work_item_type: String,
    /// Workflow state (New, Active, Done, ...)
    pub state: String,
    /// Display name of the assignee
    pub assignee: Option<String>,
    pub team: Option<String>,
    /// Actual effort (completed work or story points)
    pub effort: Option<f64>,
    /// Estimated effort before the sprint
    pub original_estimate: Option<f64>,
    pub created_date: Option<NaiveDate>,
    pub closed_date: Option<NaiveDate>,
    /// Added to the sprint after it started
    pub is_addition: bool,
    pub category: Category,
    /// 1-based row in the Data sheet
    pub row: u32,
}

impl WorkItem {
    /// Create a work item with the given id and defaults for everything else
    pub fn new(id: u64) -> Self {
        Self {
            id,
            title: String::new(),
            work_item_type: "Task".into(),
            state: "New".into(),
            assignee: None,
            team: None,
            effort: None,
            original_estimate: None,
            created_date: None,
            closed_date: None,
            is_addition: false,
            category: Category::Planned,
            row: 0,
        }
    }

    /// Set the assignee
    pub fn assign(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Set the team
    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    /// Set the actual effort
    pub fn effort(mut self, effort: f64) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Set the original estimate
    pub fn estimate(mut self, estimate: f64) -> Self {
        self.original_estimate = Some(estimate);
        self
    }

    /// Set the workflow state
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Set the work item type
    pub fn kind(mut self, work_item_type: impl Into<String>) -> Self {
        self.work_item_type = work_item_type.into();
        self
    }

    /// Mark as a mid-sprint addition
    pub fn added_mid_sprint(mut self) -> Self {
        self.is_addition = true;
        self
    }

    /// Mark as ad-hoc work
    pub fn adhoc(mut self) -> Self {
        self.category = Category::AdHoc;
        self
    }

    /// Usable by staff rollups: has both an assignee and an effort value
    pub fn is_staff_eligible(&self) -> bool {
        self.assignee.is_some() && self.effort.is_some()
    }

    /// Unplanned work: a mid-sprint addition or an ad-hoc item
    pub fn is_unplanned(&self) -> bool {
        self.is_addition || self.category == Category::AdHoc
    }
}

/// Available effort for one staff member in the sprint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub name: String,
    /// Capacity in the unit used by the effort column (days or hours)
    pub capacity: f64,
    /// Team named on the Capacity sheet, if any
    pub team: Option<String>,
}

impl CapacityRecord {
    pub fn new(name: impl Into<String>, capacity: f64) -> Self {
        Self {
            name: name.into(),
            capacity,
            team: None,
        }
    }

    /// Set the team
    pub fn team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }
}

/// Validated input for aggregation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub items: Vec<WorkItem>,
    pub capacity: Vec<CapacityRecord>,
}

impl Dataset {
    /// Look up a capacity record by case-normalized name
    pub fn capacity_of(&self, name: &str) -> Option<&CapacityRecord> {
        let key = normalize_key(name);
        self.capacity.iter().find(|c| normalize_key(&c.name) == key)
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Counts and sums shared by staff and team rollups
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub total_tasks: u32,
    pub done_tasks: u32,
    /// Items added after sprint start
    pub additions: u32,
    /// Items categorized as ad-hoc
    pub adhoc: u32,
    /// Items that are an addition or ad-hoc (counted once)
    pub unplanned: u32,
    pub total_effort: f64,
    /// Effort of items in a done state
    pub done_effort: f64,
}

/// Rollup of one staff member's work items
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaffAggregate {
    /// Case-normalized grouping key
    pub key: String,
    /// Display name (first spelling seen in the export)
    pub name: String,
    /// Team shown next to the staff member
    pub team: Option<String>,
    pub tally: Tally,
    /// Capacity from the Capacity sheet, `None` when unknown
    pub capacity: Option<f64>,
    /// Effort split by normalized team key
    pub effort_by_team: BTreeMap<String, f64>,
}

/// Rollup of one team's work items
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamAggregate {
    /// Case-normalized grouping key
    pub key: String,
    pub name: String,
    pub tally: Tally,
    /// Sum of known member capacities, `None` when no member capacity is known
    pub capacity: Option<f64>,
    /// Display names of team members, sorted by key
    pub members: Vec<String>,
    /// Effort of items kept in the team rollup but excluded from staff rollups
    pub unassigned_effort: f64,
}

// ============================================================================
// Metrics
// ============================================================================

/// The six staff/team KPIs, in display order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kpi {
    Kpi,
    PerformanceRate,
    Utilization,
    DoneTasks,
    MidSprintAddition,
    AdHoc,
}

impl Kpi {
    pub const ALL: [Kpi; 6] = [
        Kpi::Kpi,
        Kpi::PerformanceRate,
        Kpi::Utilization,
        Kpi::DoneTasks,
        Kpi::MidSprintAddition,
        Kpi::AdHoc,
    ];

    /// Label used in sheet headers and history rows
    pub fn label(&self) -> &'static str {
        match self {
            Kpi::Kpi => "KPI",
            Kpi::PerformanceRate => "Performance Rate",
            Kpi::Utilization => "Utilization",
            Kpi::DoneTasks => "Done Tasks %",
            Kpi::MidSprintAddition => "MidSprint Addition %",
            Kpi::AdHoc => "Ad-hoc %",
        }
    }
}

impl std::fmt::Display for Kpi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The five sprint-level CMMI measures, in display order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CmmiMeasure {
    CompletionRate,
    EffortEstimationAccuracy,
    BugFixingEffort,
    UtilizationRate,
    Productivity,
}

impl CmmiMeasure {
    pub const ALL: [CmmiMeasure; 5] = [
        CmmiMeasure::CompletionRate,
        CmmiMeasure::EffortEstimationAccuracy,
        CmmiMeasure::BugFixingEffort,
        CmmiMeasure::UtilizationRate,
        CmmiMeasure::Productivity,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CmmiMeasure::CompletionRate => "Completion Rate",
            CmmiMeasure::EffortEstimationAccuracy => "Effort Estimation Accuracy",
            CmmiMeasure::BugFixingEffort => "Bug Fixing Effort %",
            CmmiMeasure::UtilizationRate => "Utilization Rate",
            CmmiMeasure::Productivity => "CMMI Productivity",
        }
    }
}

impl std::fmt::Display for CmmiMeasure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Why a metric value was forced or clamped
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FlagReason {
    /// Denominator was zero; value reported as 0
    ZeroDenominator,
    /// Capacity missing from the Capacity sheet; value reported as 0
    UnknownCapacity,
    /// Value exceeded the configured ceiling and was clamped
    Capped,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::ZeroDenominator => "zero denominator",
            FlagReason::UnknownCapacity => "unknown capacity",
            FlagReason::Capped => "capped",
        }
    }
}

/// A flag raised on one metric of a metrics record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricFlag<M> {
    pub metric: M,
    pub reason: FlagReason,
}

impl<M: std::fmt::Display> std::fmt::Display for MetricFlag<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.metric, self.reason.as_str())
    }
}

/// Computed KPI values; ratios are fractions (0.25 = 25%)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiValues {
    pub done_tasks: f64,
    pub midsprint_addition: f64,
    pub adhoc: f64,
    pub utilization: f64,
    pub performance_rate: f64,
    pub kpi: f64,
}

impl KpiValues {
    pub fn get(&self, kpi: Kpi) -> f64 {
        match kpi {
            Kpi::Kpi => self.kpi,
            Kpi::PerformanceRate => self.performance_rate,
            Kpi::Utilization => self.utilization,
            Kpi::DoneTasks => self.done_tasks,
            Kpi::MidSprintAddition => self.midsprint_addition,
            Kpi::AdHoc => self.adhoc,
        }
    }
}

/// KPI record for one staff member or one team
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    /// Display name of the staff member or team
    pub name: String,
    /// Team column shown for staff rows; `None` for team rows
    pub team: Option<String>,
    pub sprint_name: String,
    /// Raw inputs the values were computed from
    pub tally: Tally,
    pub capacity: Option<f64>,
    pub values: KpiValues,
    pub flags: BTreeSet<MetricFlag<Kpi>>,
}

impl EntityMetrics {
    pub fn is_flagged(&self, kpi: Kpi) -> bool {
        self.flags.iter().any(|f| f.metric == kpi)
    }
}

/// Per-staff KPI record
pub type StaffMetrics = EntityMetrics;

/// Per-team KPI record
pub type TeamMetrics = EntityMetrics;

/// Sprint-wide totals the CMMI measures are computed from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CmmiTotals {
    pub total_tasks: u32,
    pub done_tasks: u32,
    pub estimated_effort: f64,
    pub actual_effort: f64,
    pub bug_effort: f64,
    pub done_effort: f64,
    pub total_capacity: f64,
}

/// Sprint-level process maturity measures
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CmmiMeasures {
    pub sprint_name: String,
    pub totals: CmmiTotals,
    pub completion_rate: f64,
    pub estimation_accuracy: f64,
    pub bug_fixing_effort: f64,
    pub utilization_rate: f64,
    pub productivity: f64,
    pub flags: BTreeSet<MetricFlag<CmmiMeasure>>,
}

impl CmmiMeasures {
    pub fn get(&self, measure: CmmiMeasure) -> f64 {
        match measure {
            CmmiMeasure::CompletionRate => self.completion_rate,
            CmmiMeasure::EffortEstimationAccuracy => self.estimation_accuracy,
            CmmiMeasure::BugFixingEffort => self.bug_fixing_effort,
            CmmiMeasure::UtilizationRate => self.utilization_rate,
            CmmiMeasure::Productivity => self.productivity,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Sprint metadata could not be read from the Data sheet
#[derive(Debug, Error, PartialEq)]
pub enum MetadataError {
    #[error("Missing metadata field '{field}' (expected a labeled cell in rows 3-10)")]
    Missing { field: &'static str },

    #[error("Invalid metadata field '{field}' at row {row}: {reason}")]
    Invalid {
        field: &'static str,
        row: u32,
        reason: String,
    },

    #[error("Sprint end date {end} is before start date {start}")]
    DateOrder { start: NaiveDate, end: NaiveDate },
}

/// A sheet's header row does not match the expected layout
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Sheet '{sheet}' is missing required column '{column}' (header row {row})")]
    MissingColumn {
        sheet: String,
        column: &'static str,
        row: u32,
    },

    #[error("Sheet '{sheet}' has duplicate column '{column}' (header row {row})")]
    DuplicateColumn {
        sheet: String,
        column: &'static str,
        row: u32,
    },
}

/// The workbook lacks a sheet the engine reads or updates
#[derive(Debug, Error, PartialEq)]
pub enum WorkbookStructureError {
    #[error("Sheet not found: {0}")]
    MissingSheet(String),

    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    #[error("Workbook update failed on sheet '{sheet}': {reason}")]
    Update { sheet: String, reason: String },
}

/// Analysis configuration could not be loaded or is inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Terminal failure of a processing run
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Data validation failed: {0}")]
    Data(ValidationResult),

    #[error(transparent)]
    WorkbookStructure(#[from] WorkbookStructureError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Spreadsheet format error: {0}")]
    Xlsx(String),
}

impl ProcessError {
    /// Validation result carried by a data error, if any
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            ProcessError::Data(result) => Some(result),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn normalize_key_trims_and_lowercases() {
        assert_eq!(normalize_key("  Maria   Rossi "), "maria rossi");
        assert_eq!(normalize_key("MARIA ROSSI"), "maria rossi");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn work_item_builder() {
        let item = WorkItem::new(42)
            .assign("Maria")
            .team("Core")
            .effort(3.0)
            .state("Done")
            .kind("Bug")
            .added_mid_sprint();

        assert_eq!(item.id, 42);
        assert_eq!(item.assignee.as_deref(), Some("Maria"));
        assert_eq!(item.team.as_deref(), Some("Core"));
        assert_eq!(item.effort, Some(3.0));
        assert_eq!(item.work_item_type, "Bug");
        assert!(item.is_staff_eligible());
        assert!(item.is_unplanned());
    }

    #[test]
    fn work_item_without_effort_is_not_staff_eligible() {
        let item = WorkItem::new(1).assign("Maria");
        assert!(!item.is_staff_eligible());
        assert!(!item.is_unplanned());
    }

    #[test]
    fn adhoc_item_is_unplanned() {
        let item = WorkItem::new(1).adhoc();
        assert_eq!(item.category, Category::AdHoc);
        assert!(item.is_unplanned());
    }

    #[test]
    fn sprint_length_includes_both_ends() {
        let meta = SprintMetadata {
            sprint_name: "Sprint 5".into(),
            sprint_number: 5,
            start_date: date(2025, 3, 3),
            end_date: date(2025, 3, 14),
            teams: vec![],
            planned_effort: None,
        };
        assert_eq!(meta.length_days(), 12);
    }

    #[test]
    fn dataset_capacity_lookup_is_case_insensitive() {
        let dataset = Dataset {
            items: vec![],
            capacity: vec![CapacityRecord::new("Maria Rossi", 8.0)],
        };
        assert_eq!(dataset.capacity_of("maria rossi").map(|c| c.capacity), Some(8.0));
        assert!(dataset.capacity_of("Luca").is_none());
    }

    #[test]
    fn kpi_labels_and_order() {
        let labels: Vec<_> = Kpi::ALL.iter().map(|k| k.label()).collect();
        assert_eq!(
            labels,
            vec![
                "KPI",
                "Performance Rate",
                "Utilization",
                "Done Tasks %",
                "MidSprint Addition %",
                "Ad-hoc %"
            ]
        );
    }

    #[test]
    fn kpi_values_get() {
        let values = KpiValues {
            done_tasks: 0.1,
            midsprint_addition: 0.2,
            adhoc: 0.3,
            utilization: 0.4,
            performance_rate: 0.5,
            kpi: 0.6,
        };
        assert_eq!(values.get(Kpi::DoneTasks), 0.1);
        assert_eq!(values.get(Kpi::MidSprintAddition), 0.2);
        assert_eq!(values.get(Kpi::AdHoc), 0.3);
        assert_eq!(values.get(Kpi::Utilization), 0.4);
        assert_eq!(values.get(Kpi::PerformanceRate), 0.5);
        assert_eq!(values.get(Kpi::Kpi), 0.6);
    }

    #[test]
    fn metric_flag_display() {
        let flag = MetricFlag {
            metric: Kpi::Utilization,
            reason: FlagReason::UnknownCapacity,
        };
        assert_eq!(flag.to_string(), "Utilization: unknown capacity");
    }

    #[test]
    fn metric_flags_sort_by_metric_then_reason() {
        let mut flags = BTreeSet::new();
        flags.insert(MetricFlag { metric: Kpi::Utilization, reason: FlagReason::Capped });
        flags.insert(MetricFlag { metric: Kpi::Kpi, reason: FlagReason::ZeroDenominator });
        let first = flags.iter().next().unwrap();
        assert_eq!(first.metric, Kpi::Kpi);
    }

    #[test]
    fn error_display() {
        let err = MetadataError::Missing { field: "Sprint Name" };
        assert!(err.to_string().contains("Sprint Name"));

        let err = SchemaError::MissingColumn {
            sheet: "Data".into(),
            column: "Assigned To",
            row: 21,
        };
        let msg = err.to_string();
        assert!(msg.contains("Assigned To"));
        assert!(msg.contains("21"));

        let err = WorkbookStructureError::MissingSheet("CMMI Template".into());
        assert!(err.to_string().contains("CMMI Template"));
    }

    #[test]
    fn process_error_exposes_validation() {
        let result = ValidationResult::from_issues(vec![Issue::new(
            IssueCode::E001EmptyTable,
            "work item table is empty",
        )]);
        let err = ProcessError::Data(result);
        assert!(err.validation().unwrap().is_error());

        let err: ProcessError = MetadataError::Missing { field: "End Date" }.into();
        assert!(err.validation().is_none());
    }
}
