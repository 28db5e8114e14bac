//! Update planning and application
//!
//! [`plan_updates`] turns read-only snapshots of the target sheets plus the
//! sprint's analysis into a list of [`SheetEdit`]s. Nothing is written
//! until the whole plan exists; [`apply`] then runs it against a store.

use sprintkpi_core::{
    AnalysisConfig, Grid, SprintMetadata, ValidationResult, WorkbookStructureError, CAPACITY_SHEET, CMMI_SHEET,
    DATA_SHEET, KPI_INDICATORS_SHEET, STAFF_HISTORY_SHEET, TEAM_HISTORY_SHEET,
};
use sprintkpi_metrics::Analysis;

use crate::formula::{sanitize_sheet_name, SheetRef};
use crate::sheets::{
    build_analysis_sheet, build_indicators_sheet, plan_cmmi_row, plan_history_column, AnalysisInputs, CellPatch,
};
use crate::store::WorkbookStore;

/// Sheets a run reads or writes besides the analysis sheet
pub const RESERVED_SHEETS: [&str; 6] = [
    DATA_SHEET,
    CAPACITY_SHEET,
    KPI_INDICATORS_SHEET,
    STAFF_HISTORY_SHEET,
    TEAM_HISTORY_SHEET,
    CMMI_SHEET,
];

/// One change to one sheet
#[derive(Clone, Debug, PartialEq)]
pub enum SheetEdit {
    /// Replace every cell, creating the sheet when missing
    Replace(Grid),
    /// Set the listed cells of an existing sheet
    Patch { sheet: String, cells: CellPatch },
}

impl SheetEdit {
    pub fn sheet(&self) -> &str {
        match self {
            SheetEdit::Replace(grid) => &grid.name,
            SheetEdit::Patch { sheet, .. } => sheet,
        }
    }
}

/// Every edit of one run, in application order
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatePlan {
    /// Sanitized name of the per-sprint analysis sheet
    pub analysis_sheet: String,
    pub edits: Vec<SheetEdit>,
}

/// Current contents of the sheets the plan extends
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshots {
    pub staff_history: Grid,
    pub team_history: Grid,
    pub cmmi: Grid,
}

impl Snapshots {
    /// Read the target sheets, failing on the first one missing
    pub fn take<W: WorkbookStore + ?Sized>(store: &W) -> Result<Self, WorkbookStructureError> {
        if !store.has_sheet(KPI_INDICATORS_SHEET) {
            return Err(WorkbookStructureError::MissingSheet(KPI_INDICATORS_SHEET.into()));
        }
        let read = |name: &str| {
            store
                .read_sheet(name)
                .ok_or_else(|| WorkbookStructureError::MissingSheet(name.to_string()))
        };
        Ok(Self {
            staff_history: read(STAFF_HISTORY_SHEET)?,
            team_history: read(TEAM_HISTORY_SHEET)?,
            cmmi: read(CMMI_SHEET)?,
        })
    }
}

/// What the plan is built from
pub struct PlanInputs<'a> {
    pub metadata: &'a SprintMetadata,
    pub analysis: &'a Analysis,
    pub validation: &'a ValidationResult,
    pub config: &'a AnalysisConfig,
}

/// Analysis sheet name for a sprint, sanitized and checked against the
/// sheets a run already uses
pub fn analysis_sheet_name(sprint_name: &str, config: &AnalysisConfig) -> Result<String, WorkbookStructureError> {
    let name = sanitize_sheet_name(&config.analysis_sheet_name(sprint_name))?;
    if RESERVED_SHEETS.iter().any(|reserved| reserved.eq_ignore_ascii_case(&name)) {
        return Err(WorkbookStructureError::InvalidSheetName {
            name,
            reason: "collides with a sheet the analysis reads or updates".into(),
        });
    }
    Ok(name)
}

/// Build every edit for the sprint
pub fn plan_updates(snapshots: &Snapshots, inputs: &PlanInputs<'_>) -> Result<UpdatePlan, WorkbookStructureError> {
    let metadata = inputs.metadata;
    let analysis = inputs.analysis;
    let name = analysis_sheet_name(&metadata.sprint_name, inputs.config)?;
    let sheet_ref = SheetRef::new(name.clone());

    let (analysis_grid, layout) = build_analysis_sheet(
        &name,
        &AnalysisInputs {
            metadata,
            staff: &analysis.staff_metrics,
            teams: &analysis.team_metrics,
            team_aggregates: &analysis.aggregates.teams,
            cmmi: &analysis.cmmi,
            validation: inputs.validation,
            config: inputs.config,
        },
    );
    let indicators = build_indicators_sheet(metadata, &sheet_ref, &analysis.staff_metrics, &layout);

    let sprint = metadata.sprint_name.as_str();
    let edits = vec![
        SheetEdit::Replace(analysis_grid),
        SheetEdit::Replace(indicators),
        SheetEdit::Patch {
            sheet: STAFF_HISTORY_SHEET.into(),
            cells: plan_history_column(&snapshots.staff_history, "Staff", sprint, &sheet_ref, &layout.staff_rows),
        },
        SheetEdit::Patch {
            sheet: TEAM_HISTORY_SHEET.into(),
            cells: plan_history_column(&snapshots.team_history, "Team", sprint, &sheet_ref, &layout.team_rows),
        },
        SheetEdit::Patch {
            sheet: CMMI_SHEET.into(),
            cells: plan_cmmi_row(&snapshots.cmmi, sprint, &sheet_ref, &layout),
        },
    ];

    Ok(UpdatePlan {
        analysis_sheet: name,
        edits,
    })
}

/// Run a plan against a store, in order
pub fn apply<W: WorkbookStore + ?Sized>(store: &mut W, plan: &UpdatePlan) -> Result<(), WorkbookStructureError> {
    for edit in &plan.edits {
        match edit {
            SheetEdit::Replace(grid) => store.write_sheet(grid)?,
            SheetEdit::Patch { sheet, cells } => store.write_cells(sheet, cells)?,
        }
    }
    tracing::info!(analysis_sheet = %plan.analysis_sheet, edits = plan.edits.len(), "applied workbook updates");
    Ok(())
}
