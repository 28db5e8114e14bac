//! # sprintkpi-metrics
//!
//! Validation, aggregation and metric calculation for one sprint.
//!
//! This crate provides:
//! - [`validate`]: raw extracted rows to a typed dataset plus coded issues
//! - [`aggregate`]: staff and team rollups
//! - [`calculate`]: the six staff/team KPIs and the five CMMI measures
//!
//! Every function here is pure; the workbook crate turns the results into
//! sheet edits.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sprintkpi_core::{AnalysisConfig, CapacityRecord, Dataset, SprintMetadata, WorkItem};
//! use sprintkpi_metrics::analyze;
//!
//! let metadata = SprintMetadata {
//!     sprint_name: "Sprint 5".into(),
//!     sprint_number: 5,
//!     start_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
//!     end_date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
//!     teams: vec![],
//!     planned_effort: None,
//! };
//! let dataset = Dataset {
//!     items: vec![WorkItem::new(1).assign("Maria").team("Core").effort(4.0).state("Done")],
//!     capacity: vec![CapacityRecord::new("Maria", 5.0)],
//! };
//!
//! let analysis = analyze(&dataset, &metadata, &AnalysisConfig::default());
//! assert_eq!(analysis.staff_metrics[0].values.utilization, 0.8);
//! assert_eq!(analysis.cmmi.completion_rate, 1.0);
//! ```

pub mod aggregate;
pub mod calculate;
pub mod validate;

pub use aggregate::{aggregate, Aggregates};
pub use calculate::{cmmi_measures, kpi_values, staff_metrics, team_metrics};
pub use validate::{validate, Validated};

use sprintkpi_core::{AnalysisConfig, CmmiMeasures, Dataset, SprintMetadata, StaffMetrics, TeamMetrics};

/// Everything computed for one sprint
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub aggregates: Aggregates,
    /// Sorted by staff key
    pub staff_metrics: Vec<StaffMetrics>,
    /// Sorted by team key
    pub team_metrics: Vec<TeamMetrics>,
    pub cmmi: CmmiMeasures,
}

impl Analysis {
    /// Mean KPI over teams, 0 when there are none
    pub fn average_team_kpi(&self) -> f64 {
        if self.team_metrics.is_empty() {
            return 0.0;
        }
        self.team_metrics.iter().map(|t| t.values.kpi).sum::<f64>() / self.team_metrics.len() as f64
    }
}

/// Aggregate a validated dataset and compute every metric
pub fn analyze(dataset: &Dataset, metadata: &SprintMetadata, config: &AnalysisConfig) -> Analysis {
    let aggregates = aggregate(dataset, config);
    let staff_metrics: Vec<_> = aggregates
        .staff
        .iter()
        .map(|s| staff_metrics(s, metadata, config))
        .collect();
    let team_metrics: Vec<_> = aggregates
        .teams
        .iter()
        .map(|t| team_metrics(t, metadata, config))
        .collect();
    let cmmi = cmmi_measures(dataset, metadata, config);

    let flagged = staff_metrics
        .iter()
        .chain(&team_metrics)
        .filter(|m| !m.flags.is_empty())
        .count();
    tracing::info!(
        sprint = %metadata.sprint_name,
        staff = staff_metrics.len(),
        teams = team_metrics.len(),
        flagged,
        "computed metrics"
    );

    Analysis {
        aggregates,
        staff_metrics,
        team_metrics,
        cmmi,
    }
}
