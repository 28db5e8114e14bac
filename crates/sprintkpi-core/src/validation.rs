//! Validation results
//!
//! Every problem found in the extracted dataset becomes an [`Issue`] with a
//! stable code. Error codes (`E…`) abort the run; warning codes (`W…`) are
//! reported next to the computed metrics.
//!
//! | Code | Severity | Meaning |
//! |------|----------|---------|
//! | E001 | error | work item table has no data rows |
//! | E002 | error | duplicate work item id |
//! | E003 | error | no row usable by staff or team rollups |
//! | W001 | warning | row has no assignee |
//! | W002 | warning | row has no usable effort value |
//! | W003 | warning | assignee missing from the Capacity sheet |
//! | W004 | warning | row has no usable id and was dropped |
//! | W005 | warning | capacity value is not a non-negative number |
//! | W006 | warning | staff member listed twice on the Capacity sheet |
//! | W007 | warning | unrecognized category, treated as planned |

use serde::{Deserialize, Serialize};

/// Issue severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Machine-classifiable issue kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    E001EmptyTable,
    E002DuplicateId,
    E003NoUsableRows,
    W001MissingAssignee,
    W002MissingEffort,
    W003UnknownCapacity,
    W004InvalidId,
    W005InvalidCapacity,
    W006DuplicateCapacity,
    W007UnknownCategory,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::E001EmptyTable => "E001",
            IssueCode::E002DuplicateId => "E002",
            IssueCode::E003NoUsableRows => "E003",
            IssueCode::W001MissingAssignee => "W001",
            IssueCode::W002MissingEffort => "W002",
            IssueCode::W003UnknownCapacity => "W003",
            IssueCode::W004InvalidId => "W004",
            IssueCode::W005InvalidCapacity => "W005",
            IssueCode::W006DuplicateCapacity => "W006",
            IssueCode::W007UnknownCategory => "W007",
        }
    }

    /// Severity implied by the code
    pub fn severity(&self) -> Severity {
        match self {
            IssueCode::E001EmptyTable | IssueCode::E002DuplicateId | IssueCode::E003NoUsableRows => {
                Severity::Error
            }
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single validation finding
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    /// Sheet the finding refers to
    pub sheet: Option<String>,
    /// 1-based source row
    pub row: Option<u32>,
}

impl Issue {
    /// Create an issue with the severity implied by its code
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            sheet: None,
            row: None,
        }
    }

    /// Attach a source location
    pub fn at(mut self, sheet: impl Into<String>, row: u32) -> Self {
        self.sheet = Some(sheet.into());
        self.row = Some(row);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let (Some(sheet), Some(row)) = (&self.sheet, self.row) {
            write!(f, " ({}!{})", sheet, row)?;
        }
        Ok(())
    }
}

/// Overall outcome of validation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Ok => "ok",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Error => "error",
        }
    }
}

/// Status plus ordered issues
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub issues: Vec<Issue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            status: ValidationStatus::Ok,
            issues: Vec::new(),
        }
    }
}

impl ValidationResult {
    /// Derive the status from the worst issue
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let status = if issues.iter().any(Issue::is_error) {
            ValidationStatus::Error
        } else if issues.is_empty() {
            ValidationStatus::Ok
        } else {
            ValidationStatus::Warning
        };
        Self { status, issues }
    }

    pub fn is_error(&self) -> bool {
        self.status == ValidationStatus::Error
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Issues carrying the given code
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.code == code)
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let errors = self.errors().count();
        let warnings = self.warnings().count();
        write!(f, "{} ({} errors, {} warnings)", self.status.as_str(), errors, warnings)?;
        if let Some(first) = self.errors().next() {
            write!(f, "; first error: {}", first.message)?;
        }
        Ok(())
    }
}
