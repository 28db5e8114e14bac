//! Analysis configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! done_states = ["Done", "Closed", "Resolved", "Completed"]
//! bug_types = ["Bug"]
//! adhoc_categories = ["Ad-hoc", "Adhoc", "Unplanned"]
//! utilization_ceiling = 1.5
//! analysis_suffix = " Analysis"
//!
//! [weights]
//! done_tasks = 0.3
//! utilization = 0.2
//! performance_rate = 0.3
//! stability = 0.2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Weights of the composite KPI
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KpiWeights {
    /// Weight of Done Tasks %
    pub done_tasks: f64,
    /// Weight of Utilization (capped at 1 inside the KPI)
    pub utilization: f64,
    /// Weight of Performance Rate (capped at 1 inside the KPI)
    pub performance_rate: f64,
    /// Weight of scope stability, `1 - unplanned / total`
    pub stability: f64,
}

impl Default for KpiWeights {
    fn default() -> Self {
        Self {
            done_tasks: 0.3,
            utilization: 0.2,
            performance_rate: 0.3,
            stability: 0.2,
        }
    }
}

impl KpiWeights {
    pub fn sum(&self) -> f64 {
        self.done_tasks + self.utilization + self.performance_rate + self.stability
    }
}

/// Tunable parameters of the analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Work item states counted as done (case-insensitive)
    pub done_states: Vec<String>,
    /// Work item types counted as bug fixing (case-insensitive)
    pub bug_types: Vec<String>,
    /// Category values marking ad-hoc work (case-insensitive)
    pub adhoc_categories: Vec<String>,
    /// Upper bound for Utilization
    pub utilization_ceiling: f64,
    pub weights: KpiWeights,
    /// Appended to the sprint name to form the analysis sheet name
    pub analysis_suffix: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            done_states: vec!["Done".into(), "Closed".into(), "Resolved".into(), "Completed".into()],
            bug_types: vec!["Bug".into()],
            adhoc_categories: vec!["Ad-hoc".into(), "Adhoc".into(), "Unplanned".into()],
            utilization_ceiling: 1.5,
            weights: KpiWeights::default(),
            analysis_suffix: " Analysis".into(),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        let all = [w.done_tasks, w.utilization, w.performance_rate, w.stability];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::Invalid("KPI weights must be non-negative numbers".into()));
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(ConfigError::Invalid(format!(
                "KPI weights must sum to 1.0 (got {:.4})",
                w.sum()
            )));
        }
        if !self.utilization_ceiling.is_finite() || self.utilization_ceiling < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "utilization_ceiling must be at least 1.0 (got {})",
                self.utilization_ceiling
            )));
        }
        if self.done_states.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("done_states must name at least one state".into()));
        }
        if self.analysis_suffix.trim().is_empty() {
            return Err(ConfigError::Invalid("analysis_suffix must not be blank".into()));
        }
        Ok(())
    }

    pub fn is_done(&self, state: &str) -> bool {
        contains_ignore_case(&self.done_states, state)
    }

    pub fn is_bug(&self, work_item_type: &str) -> bool {
        contains_ignore_case(&self.bug_types, work_item_type)
    }

    pub fn is_adhoc(&self, category: &str) -> bool {
        contains_ignore_case(&self.adhoc_categories, category)
    }

    /// Name of the per-sprint analysis sheet before sanitizing
    pub fn analysis_sheet_name(&self, sprint_name: &str) -> String {
        format!("{}{}", sprint_name.trim(), self.analysis_suffix)
    }
}

fn contains_ignore_case(values: &[String], needle: &str) -> bool {
    let needle = needle.trim();
    values.iter().any(|v| v.trim().eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            done_states = ["Done"]
            utilization_ceiling = 2.0

            [weights]
            done_tasks = 0.25
            utilization = 0.25
            performance_rate = 0.25
            stability = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.done_states, vec!["Done".to_string()]);
        assert_eq!(config.utilization_ceiling, 2.0);
        assert_eq!(config.weights.stability, 0.25);
        assert_eq!(config.bug_types, vec!["Bug".to_string()]);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let err = AnalysisConfig::from_toml_str(
            r#"
            [weights]
            done_tasks = 0.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut config = AnalysisConfig::default();
        config.weights.done_tasks = -0.1;
        config.weights.stability = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn ceiling_below_one_rejected() {
        let mut config = AnalysisConfig::default();
        config.utilization_ceiling = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_field_rejected() {
        let result = AnalysisConfig::from_toml_str("colour = \"blue\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn classification_is_case_insensitive() {
        let config = AnalysisConfig::default();
        assert!(config.is_done("closed"));
        assert!(config.is_done(" DONE "));
        assert!(!config.is_done("Active"));
        assert!(config.is_bug("bug"));
        assert!(config.is_adhoc("AD-HOC"));
    }

    #[test]
    fn analysis_sheet_name_appends_suffix() {
        let config = AnalysisConfig::default();
        assert_eq!(config.analysis_sheet_name("Sprint 42"), "Sprint 42 Analysis");
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "bug_types = [\"Bug\", \"Defect\"]").unwrap();

        let config = AnalysisConfig::load(file.path()).unwrap();
        assert!(config.is_bug("defect"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = AnalysisConfig::load(Path::new("/nonexistent/sprintkpi.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
