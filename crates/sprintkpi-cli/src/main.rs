//! sprintkpi CLI - Sprint KPI & CMMI workbook engine
//!
//! Command-line interface for analyzing sprint tracking workbooks.

mod diagnostics;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use sprintkpi_core::{AnalysisConfig, ProcessError, ValidationResult};
use sprintkpi_workbook::{check, process, ProcessOutput};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diagnostics::{DiagnosticConfig, ExitCode, IssueEmitter, JsonEmitter, TerminalEmitter};

#[derive(Parser)]
#[command(name = "sprintkpi")]
#[command(author, version, about = "Sprint KPI and CMMI analysis for tracking workbooks", long_about = None)]
struct Cli {
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a workbook and write the updated copy
    Process {
        /// Input workbook (.xlsx or .xlsm)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output file (defaults to <FILE stem>_analyzed.xlsx, or .xlsm, next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Extract and validate a workbook without writing anything
    Check {
        /// Input workbook (.xlsx or .xlsm)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Analysis configuration (TOML)
    #[arg(short, long, value_name = "CONFIG", env = "SPRINTKPI_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Treat warnings as errors
    #[arg(long)]
    strict: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

impl RunOptions {
    fn diagnostics(&self) -> DiagnosticConfig {
        DiagnosticConfig {
            strict: self.strict,
            quiet: self.quiet,
        }
    }

    fn load_config(&self) -> Result<AnalysisConfig> {
        match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display())),
            None => Ok(AnalysisConfig::default()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Process { file, output, options } => cmd_process(&file, output, &options),
        Commands::Check { file, options } => cmd_check(&file, &options),
    };

    match outcome {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::Failure.into()
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// `<stem>_analyzed.xlsx` next to the input; `.xlsm` input keeps its
/// extension since the macros are written back
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("workbook");
    let extension = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsm") => "xlsm",
        _ => "xlsx",
    };
    input.with_file_name(format!("{stem}_analyzed.{extension}"))
}

fn read_input(file: &Path) -> Result<Vec<u8>> {
    std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))
}

/// Emit validation issues in the requested format, returning the exit code
/// and the JSON form (empty for text output)
fn report_issues(validation: &ValidationResult, options: &RunOptions) -> (ExitCode, serde_json::Value) {
    match options.format {
        OutputFormat::Text => {
            let mut emitter = TerminalEmitter::new(std::io::stderr(), options.diagnostics());
            emitter.emit_all(&validation.issues);
            (emitter.exit_code(), serde_json::Value::Null)
        }
        OutputFormat::Json => {
            let mut emitter = JsonEmitter::new(options.diagnostics());
            emitter.emit_all(&validation.issues);
            (emitter.exit_code(), emitter.to_json_value())
        }
    }
}

fn cmd_process(file: &Path, output: Option<PathBuf>, options: &RunOptions) -> Result<ExitCode> {
    let config = options.load_config()?;
    let input = read_input(file)?;

    let result = match process(&input, &config) {
        Ok(result) => result,
        Err(ProcessError::Data(validation)) => {
            let (_, diagnostics) = report_issues(&validation, options);
            if options.format == OutputFormat::Json {
                println!("{}", json!({ "status": "error", "diagnostics": diagnostics }));
            }
            return Ok(ExitCode::Failure);
        }
        Err(err) => return Err(err).with_context(|| format!("failed to process {}", file.display())),
    };

    let (code, diagnostics) = report_issues(&result.validation, options);
    if !code.is_success() {
        if options.format == OutputFormat::Json {
            println!("{}", json!({ "status": "error", "diagnostics": diagnostics }));
        } else if !options.quiet {
            eprintln!("no workbook written: warnings are errors in strict mode");
        }
        return Ok(code);
    }

    let output = output.unwrap_or_else(|| default_output_path(file));
    std::fs::write(&output, &result.workbook).with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(output = %output.display(), bytes = result.workbook.len(), "wrote workbook");

    match options.format {
        OutputFormat::Text if !options.quiet => print_summary(&result, &output),
        OutputFormat::Text => {}
        OutputFormat::Json => {
            let report = json!({
                "status": result.validation.status.as_str(),
                "output": output.display().to_string(),
                "summary": result.summary(),
                "staff": result.staff_metrics,
                "teams": result.team_metrics,
                "cmmi": result.cmmi,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(code)
}

fn print_summary(result: &ProcessOutput, output: &Path) {
    let summary = result.summary();
    println!("Processed {} -> {}", summary.sprint, output.display());
    println!("  Analysis sheet:   {}", summary.analysis_sheet);
    println!("  Staff analyzed:   {}", summary.staff_analyzed);
    println!("  Teams processed:  {}", summary.teams_processed);
    println!("  Average team KPI: {:.1}%", summary.average_team_kpi * 100.0);
    println!("  CMMI completion:  {:.1}%", summary.completion_rate * 100.0);
    if summary.warnings > 0 {
        println!("  Warnings:         {}", summary.warnings);
    }
}

fn cmd_check(file: &Path, options: &RunOptions) -> Result<ExitCode> {
    let config = options.load_config()?;
    let input = read_input(file)?;
    let report = check(&input, &config).with_context(|| format!("failed to check {}", file.display()))?;

    let (code, diagnostics) = report_issues(&report.validation, options);
    match options.format {
        OutputFormat::Text if !options.quiet => {
            let meta = &report.metadata;
            println!(
                "{} (#{}, {} to {}): {}",
                meta.sprint_name,
                meta.sprint_number,
                meta.start_date,
                meta.end_date,
                report.validation.status.as_str()
            );
        }
        OutputFormat::Text => {}
        OutputFormat::Json => {
            let out = json!({
                "status": report.validation.status.as_str(),
                "metadata": report.metadata,
                "diagnostics": diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(code)
}
