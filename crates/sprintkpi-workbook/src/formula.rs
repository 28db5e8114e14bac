//! Formula builder
//!
//! Maps metric definitions to spreadsheet expressions over cell references,
//! so that written sheets recompute when the raw numbers are edited. The
//! expressions mirror `sprintkpi_metrics::calculate` cell for cell.
//!
//! Expressions are produced without the leading `=`.

use sprintkpi_core::{CellRef, CellValue, KpiWeights, WorkbookStructureError};

/// Longest sheet name Excel accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Make a sheet name acceptable to Excel.
///
/// Forbidden characters become `_`, leading and trailing apostrophes are
/// dropped and the result is cut to 31 characters.
pub fn sanitize_sheet_name(name: &str) -> Result<String, WorkbookStructureError> {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let cut: String = trimmed.chars().take(MAX_SHEET_NAME_LEN).collect();
    let cut = cut.trim_end().to_string();

    if cut.is_empty() {
        return Err(WorkbookStructureError::InvalidSheetName {
            name: name.to_string(),
            reason: "name is empty after removing characters Excel does not allow".into(),
        });
    }
    if cut.eq_ignore_ascii_case("History") {
        return Err(WorkbookStructureError::InvalidSheetName {
            name: name.to_string(),
            reason: "'History' is reserved by Excel".into(),
        });
    }
    Ok(cut)
}

/// A sheet referenced from another sheet's formula
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRef(String);

impl SheetRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Quoted prefix, `'Sprint 5 Analysis'!`
    pub fn prefix(&self) -> String {
        format!("'{}'!", self.0.replace('\'', "''"))
    }

    /// Reference to one cell of this sheet, `'Sprint 5 Analysis'!P6`
    pub fn cell(&self, at: CellRef) -> String {
        format!("{}{}", self.prefix(), at.a1())
    }
}

/// A formula expression without the leading `=`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula(String);

impl Formula {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `numerator / denominator`, 0 when the denominator is blank or zero
    pub fn ratio(numerator: CellRef, denominator: CellRef) -> Self {
        Self(format!(
            "IF(N({den})=0,0,{num}/{den})",
            num = numerator.a1(),
            den = denominator.a1()
        ))
    }

    /// Effort over capacity, clamped to `ceiling`; 0 when capacity is blank or zero
    pub fn capped_ratio(numerator: CellRef, capacity: CellRef, ceiling: f64) -> Self {
        Self(format!(
            "IF(N({cap})<=0,0,MIN({num}/{cap},{ceiling}))",
            num = numerator.a1(),
            cap = capacity.a1(),
            ceiling = number(ceiling)
        ))
    }

    /// Weighted composite KPI.
    ///
    /// `unplanned` and `total` are raw task counts; the other three are the
    /// ratio cells of the same row.
    pub fn kpi(
        weights: &KpiWeights,
        done_pct: CellRef,
        utilization: CellRef,
        performance: CellRef,
        unplanned: CellRef,
        total: CellRef,
    ) -> Self {
        Self(format!(
            "{wd}*{done}+{wu}*MIN({util},1)+{wp}*MIN({perf},1)+{ws}*(1-IF(N({total})=0,0,{unplanned}/{total}))",
            wd = number(weights.done_tasks),
            wu = number(weights.utilization),
            wp = number(weights.performance_rate),
            ws = number(weights.stability),
            done = done_pct.a1(),
            util = utilization.a1(),
            perf = performance.a1(),
            unplanned = unplanned.a1(),
            total = total.a1(),
        ))
    }

    /// `clamp(1 - |estimated - actual| / estimated, 0, 1)`, 0 without an estimate
    pub fn estimation_accuracy(estimated: CellRef, actual: CellRef) -> Self {
        Self(format!(
            "IF(N({est})=0,0,MAX(0,MIN(1,1-ABS({est}-{act})/{est})))",
            est = estimated.a1(),
            act = actual.a1()
        ))
    }

    /// Plain reference to a cell of another sheet
    pub fn cross_sheet(sheet: &SheetRef, at: CellRef) -> Self {
        Self(sheet.cell(at))
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "={}", self.0)
    }
}

impl From<Formula> for CellValue {
    fn from(formula: Formula) -> Self {
        CellValue::Formula(formula.0)
    }
}

/// Shortest decimal form of a constant
fn number(value: f64) -> String {
    format!("{}", value)
}
