//! Validation issue output for the CLI
//!
//! Two emitters share one policy:
//! - `TerminalEmitter`: rustc-style lines to a writer (stderr in practice)
//! - `JsonEmitter`: collected for the JSON report
//!
//! ## Exit Code Semantics
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: no errors (warnings allowed) |
//! | 1 | Failure: one or more errors emitted, or the run failed |
//!
//! - **`--strict`**: warnings escalate to errors, so a sprint with warnings
//!   exits 1 and no workbook is written
//! - **`--quiet`**: hides warnings, never changes the exit code
//! - **`--format=json`**: same exit codes as text

use std::io::Write;
use std::process;

use serde::Serialize;
use sprintkpi_core::{Issue, Severity};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// No errors (warnings allowed)
    Success = 0,
    /// One or more errors
    Failure = 1,
}

impl ExitCode {
    /// The error count should already reflect strict escalation
    pub fn from_error_count(count: usize) -> Self {
        if count > 0 {
            ExitCode::Failure
        } else {
            ExitCode::Success
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code as u8)
    }
}

/// Configuration for issue output
#[derive(Debug, Clone, Default)]
pub struct DiagnosticConfig {
    /// Escalate warnings to errors
    pub strict: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}

impl DiagnosticConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Default::default()
        }
    }

    /// Severity after strict escalation
    pub fn effective_severity(&self, severity: Severity) -> Severity {
        if self.strict {
            Severity::Error
        } else {
            severity
        }
    }

    pub fn should_show(&self, severity: Severity) -> bool {
        !self.quiet || self.effective_severity(severity) == Severity::Error
    }
}

/// Sink for validation issues
pub trait IssueEmitter {
    fn emit(&mut self, issue: &Issue);

    fn emit_all<'a>(&mut self, issues: impl IntoIterator<Item = &'a Issue>)
    where
        Self: Sized,
    {
        for issue in issues {
            self.emit(issue);
        }
    }

    /// Exit code implied by what was emitted
    fn exit_code(&self) -> ExitCode;
}

/// `Data!22` style location of an issue
fn location(issue: &Issue) -> Option<String> {
    match (&issue.sheet, issue.row) {
        (Some(sheet), Some(row)) => Some(format!("{sheet}!{row}")),
        (Some(sheet), None) => Some(sheet.clone()),
        _ => None,
    }
}

/// Terminal emitter writing rustc-style issues
pub struct TerminalEmitter<W: Write> {
    writer: W,
    config: DiagnosticConfig,
    error_count: usize,
    warning_count: usize,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, config: DiagnosticConfig) -> Self {
        Self {
            writer,
            config,
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    fn write_issue(&mut self, issue: &Issue) -> std::io::Result<()> {
        let severity = self.config.effective_severity(issue.severity);
        match severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
        }
        if !self.config.should_show(issue.severity) {
            return Ok(());
        }

        writeln!(self.writer, "{}[{}]: {}", severity.as_str(), issue.code.as_str(), issue.message)?;
        if let Some(at) = location(issue) {
            writeln!(self.writer, "  --> {at}")?;
        }
        writeln!(self.writer)
    }
}

impl<W: Write> IssueEmitter for TerminalEmitter<W> {
    fn emit(&mut self, issue: &Issue) {
        // stderr may be closed
        let _ = self.write_issue(issue);
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.error_count)
    }
}

/// JSON representation of an issue
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    pub code: String,
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
}

/// Collects issues for a JSON report
pub struct JsonEmitter {
    diagnostics: Vec<JsonDiagnostic>,
    config: DiagnosticConfig,
    error_count: usize,
}

impl JsonEmitter {
    pub fn new(config: DiagnosticConfig) -> Self {
        Self {
            diagnostics: Vec::new(),
            config,
            error_count: 0,
        }
    }

    pub fn diagnostics(&self) -> &[JsonDiagnostic] {
        &self.diagnostics
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(&self.diagnostics).unwrap_or(serde_json::Value::Null)
    }
}

impl IssueEmitter for JsonEmitter {
    fn emit(&mut self, issue: &Issue) {
        let severity = self.config.effective_severity(issue.severity);
        if severity == Severity::Error {
            self.error_count += 1;
        }
        if !self.config.should_show(issue.severity) {
            return;
        }
        self.diagnostics.push(JsonDiagnostic {
            code: issue.code.as_str().to_string(),
            severity: severity.as_str().to_string(),
            message: issue.message.clone(),
            sheet: issue.sheet.clone(),
            row: issue.row,
        });
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from_error_count(self.error_count)
    }
}
