//! # sprintkpi-workbook
//!
//! Runs the whole sprint analysis against a workbook and writes the results
//! back as formulas.
//!
//! A run reads the Data and Capacity sheets, validates and analyzes them,
//! then updates five sheets:
//!
//! | Sheet | Update |
//! |-------|--------|
//! | `<sprint> Analysis` | rebuilt from scratch |
//! | `Kpi Indicators` | rebuilt, cells reference the analysis sheet |
//! | `Kpi Indicators Per Staff` | one column per sprint |
//! | `Kpi Indicators Per Team` | one column per sprint |
//! | `CMMI Template` | one row per sprint |
//!
//! Every other sheet keeps its cells. Processing the same sprint twice
//! rewrites its column and row in place.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sprintkpi_core::AnalysisConfig;
//!
//! let input = std::fs::read("sprint.xlsx").unwrap();
//! let output = sprintkpi_workbook::process(&input, &AnalysisConfig::default()).unwrap();
//! std::fs::write("sprint_analyzed.xlsx", &output.workbook).unwrap();
//! println!("{} staff analyzed", output.staff_metrics.len());
//! ```

pub mod formula;
pub mod plan;
pub mod sheets;
pub mod store;
pub mod xlsx;

pub use formula::{sanitize_sheet_name, Formula, SheetRef};
pub use plan::{apply, plan_updates, PlanInputs, SheetEdit, Snapshots, UpdatePlan};
pub use store::{MemoryWorkbook, WorkbookStore};
pub use xlsx::{CellRead, SheetView, XlsxWorkbook};

use serde::Serialize;
use sprintkpi_core::{
    AnalysisConfig, CmmiMeasures, ProcessError, SprintMetadata, StaffMetrics, TeamMetrics, ValidationResult,
    WorkbookStructureError, CAPACITY_SHEET, DATA_SHEET,
};
use sprintkpi_metrics::{analyze, validate, Analysis};
use sprintkpi_parser::extract;

/// Result of a run against a store
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub metadata: SprintMetadata,
    pub validation: ValidationResult,
    pub analysis: Analysis,
    /// Name the analysis sheet was written under
    pub analysis_sheet: String,
}

/// Extract, validate, analyze and update `store`.
///
/// Data and Capacity are read as values, so a formula cell there counts
/// with its cached result.
///
/// All edits are planned before the first write. On error nothing has been
/// written unless the store itself failed mid-apply.
pub fn run<W: WorkbookStore + ?Sized>(store: &mut W, config: &AnalysisConfig) -> Result<Report, ProcessError> {
    let data = store
        .read_values(DATA_SHEET)
        .ok_or_else(|| WorkbookStructureError::MissingSheet(DATA_SHEET.into()))?;
    let capacity = store
        .read_values(CAPACITY_SHEET)
        .ok_or_else(|| WorkbookStructureError::MissingSheet(CAPACITY_SHEET.into()))?;

    let extraction = extract(&data, &capacity)?;
    let validated = validate(&extraction.items, &extraction.capacity, &extraction.metadata, config);
    let Some(dataset) = validated.dataset else {
        tracing::info!(errors = validated.result.errors().count(), "validation failed");
        return Err(ProcessError::Data(validated.result));
    };
    let snapshots = Snapshots::take(&*store)?;

    let analysis = analyze(&dataset, &extraction.metadata, config);
    let plan = plan_updates(
        &snapshots,
        &PlanInputs {
            metadata: &extraction.metadata,
            analysis: &analysis,
            validation: &validated.result,
            config,
        },
    )?;
    apply(store, &plan)?;

    tracing::info!(
        sprint = %extraction.metadata.sprint_name,
        staff = analysis.staff_metrics.len(),
        teams = analysis.team_metrics.len(),
        "sprint processed"
    );

    Ok(Report {
        metadata: extraction.metadata,
        validation: validated.result,
        analysis,
        analysis_sheet: plan.analysis_sheet,
    })
}

/// Output of [`process`]
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessOutput {
    /// The updated workbook as `.xlsx` bytes
    pub workbook: Vec<u8>,
    pub metadata: SprintMetadata,
    pub analysis_sheet: String,
    pub validation: ValidationResult,
    pub staff_metrics: Vec<StaffMetrics>,
    pub team_metrics: Vec<TeamMetrics>,
    pub cmmi: CmmiMeasures,
    pub average_team_kpi: f64,
}

impl ProcessOutput {
    pub fn summary(&self) -> Summary {
        Summary {
            sprint: self.metadata.sprint_name.clone(),
            analysis_sheet: self.analysis_sheet.clone(),
            staff_analyzed: self.staff_metrics.len(),
            teams_processed: self.team_metrics.len(),
            average_team_kpi: self.average_team_kpi,
            completion_rate: self.cmmi.completion_rate,
            warnings: self.validation.warnings().count(),
        }
    }
}

/// Headline numbers of a run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub sprint: String,
    pub analysis_sheet: String,
    pub staff_analyzed: usize,
    pub teams_processed: usize,
    pub average_team_kpi: f64,
    pub completion_rate: f64,
    pub warnings: usize,
}

/// Process an `.xlsx` workbook held in memory.
///
/// The input bytes are never modified; the updated workbook is returned
/// only when every step succeeded.
pub fn process(input: &[u8], config: &AnalysisConfig) -> Result<ProcessOutput, ProcessError> {
    config.validate()?;
    let mut book = XlsxWorkbook::from_bytes(input)?;
    let report = run(&mut book, config)?;
    let workbook = book.to_bytes()?;

    let average_team_kpi = report.analysis.average_team_kpi();
    let Analysis {
        staff_metrics,
        team_metrics,
        cmmi,
        ..
    } = report.analysis;

    Ok(ProcessOutput {
        workbook,
        metadata: report.metadata,
        analysis_sheet: report.analysis_sheet,
        validation: report.validation,
        staff_metrics,
        team_metrics,
        cmmi,
        average_team_kpi,
    })
}

/// Output of [`check`]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckReport {
    pub metadata: SprintMetadata,
    pub validation: ValidationResult,
}

/// Extract and validate without writing anything.
///
/// Layout problems are errors; row-level problems are reported in the
/// returned validation result.
pub fn check(input: &[u8], config: &AnalysisConfig) -> Result<CheckReport, ProcessError> {
    config.validate()?;
    let book = XlsxWorkbook::from_bytes(input)?;
    let data = book
        .value_view(DATA_SHEET)
        .ok_or_else(|| WorkbookStructureError::MissingSheet(DATA_SHEET.into()))?;
    let capacity = book
        .value_view(CAPACITY_SHEET)
        .ok_or_else(|| WorkbookStructureError::MissingSheet(CAPACITY_SHEET.into()))?;

    let extraction = extract(&data, &capacity)?;
    let validated = validate(&extraction.items, &extraction.capacity, &extraction.metadata, config);
    Ok(CheckReport {
        metadata: extraction.metadata,
        validation: validated.result,
    })
}
