//! Metrics calculator: KPI values per staff/team and sprint CMMI measures
//!
//! Every ratio goes through [`ratio`], which turns a zero denominator into
//! a 0 value plus a flag instead of NaN or infinity.

use std::collections::BTreeSet;

use sprintkpi_core::{
    AnalysisConfig, CmmiMeasure, CmmiMeasures, CmmiTotals, Dataset, EntityMetrics, FlagReason, Kpi, KpiValues,
    MetricFlag, SprintMetadata, StaffAggregate, StaffMetrics, Tally, TeamAggregate, TeamMetrics,
};

/// Divide, reporting 0 and flagging `metric` when the denominator is 0
pub fn ratio<M: Ord + Copy>(numerator: f64, denominator: f64, metric: M, flags: &mut BTreeSet<MetricFlag<M>>) -> f64 {
    if denominator == 0.0 {
        flags.insert(MetricFlag {
            metric,
            reason: FlagReason::ZeroDenominator,
        });
        0.0
    } else {
        numerator / denominator
    }
}

/// Upper bound for Performance Rate; done effort beyond capacity is clamped
pub const PERFORMANCE_RATE_CEILING: f64 = 1.0;

/// Clamp `value` to `ceiling`, flagging `metric` as capped when it was above
fn cap(value: f64, ceiling: f64, metric: Kpi, flags: &mut BTreeSet<MetricFlag<Kpi>>) -> f64 {
    if value > ceiling {
        flags.insert(MetricFlag {
            metric,
            reason: FlagReason::Capped,
        });
        ceiling
    } else {
        value
    }
}

/// Divide by a capacity that may be unknown
fn capacity_ratio(numerator: f64, capacity: Option<f64>, metric: Kpi, flags: &mut BTreeSet<MetricFlag<Kpi>>) -> f64 {
    match capacity {
        Some(capacity) => ratio(numerator, capacity, metric, flags),
        None => {
            flags.insert(MetricFlag {
                metric,
                reason: FlagReason::UnknownCapacity,
            });
            0.0
        }
    }
}

/// KPI values for one tally against one capacity
pub fn kpi_values(tally: &Tally, capacity: Option<f64>, config: &AnalysisConfig) -> (KpiValues, BTreeSet<MetricFlag<Kpi>>) {
    let mut flags = BTreeSet::new();
    let total = tally.total_tasks as f64;

    let done_tasks = ratio(tally.done_tasks as f64, total, Kpi::DoneTasks, &mut flags);
    let midsprint_addition = ratio(tally.additions as f64, total, Kpi::MidSprintAddition, &mut flags);
    let adhoc = ratio(tally.adhoc as f64, total, Kpi::AdHoc, &mut flags);

    let utilization = cap(
        capacity_ratio(tally.total_effort, capacity, Kpi::Utilization, &mut flags),
        config.utilization_ceiling,
        Kpi::Utilization,
        &mut flags,
    );
    let performance_rate = cap(
        capacity_ratio(tally.done_effort, capacity, Kpi::PerformanceRate, &mut flags),
        PERFORMANCE_RATE_CEILING,
        Kpi::PerformanceRate,
        &mut flags,
    );

    let unplanned_share = ratio(tally.unplanned as f64, total, Kpi::Kpi, &mut flags);
    let w = &config.weights;
    let kpi = w.done_tasks * done_tasks
        + w.utilization * utilization.min(1.0)
        + w.performance_rate * performance_rate.min(1.0)
        + w.stability * (1.0 - unplanned_share);

    let values = KpiValues {
        done_tasks,
        midsprint_addition,
        adhoc,
        utilization,
        performance_rate,
        kpi,
    };
    (values, flags)
}

/// KPI record for one staff member
pub fn staff_metrics(staff: &StaffAggregate, metadata: &SprintMetadata, config: &AnalysisConfig) -> StaffMetrics {
    let (values, flags) = kpi_values(&staff.tally, staff.capacity, config);
    EntityMetrics {
        name: staff.name.clone(),
        team: staff.team.clone(),
        sprint_name: metadata.sprint_name.clone(),
        tally: staff.tally.clone(),
        capacity: staff.capacity,
        values,
        flags,
    }
}

/// KPI record for one team
pub fn team_metrics(team: &TeamAggregate, metadata: &SprintMetadata, config: &AnalysisConfig) -> TeamMetrics {
    let (values, flags) = kpi_values(&team.tally, team.capacity, config);
    EntityMetrics {
        name: team.name.clone(),
        team: None,
        sprint_name: metadata.sprint_name.clone(),
        tally: team.tally.clone(),
        capacity: team.capacity,
        values,
        flags,
    }
}

/// Sprint-wide totals over every validated item and capacity record
pub fn cmmi_totals(dataset: &Dataset, metadata: &SprintMetadata, config: &AnalysisConfig) -> CmmiTotals {
    let mut totals = CmmiTotals::default();
    let mut estimate_sum = 0.0;
    let mut has_estimate = false;

    for item in &dataset.items {
        let effort = item.effort.unwrap_or(0.0);
        totals.total_tasks += 1;
        totals.actual_effort += effort;
        if config.is_done(&item.state) {
            totals.done_tasks += 1;
            totals.done_effort += effort;
        }
        if config.is_bug(&item.work_item_type) {
            totals.bug_effort += effort;
        }
        if let Some(estimate) = item.original_estimate {
            estimate_sum += estimate;
            has_estimate = true;
        }
    }

    totals.estimated_effort = if has_estimate {
        estimate_sum
    } else {
        metadata.planned_effort.unwrap_or(0.0)
    };
    totals.total_capacity = dataset.capacity.iter().map(|c| c.capacity).sum();
    totals
}

/// The five CMMI measures of the sprint
pub fn cmmi_measures(dataset: &Dataset, metadata: &SprintMetadata, config: &AnalysisConfig) -> CmmiMeasures {
    let totals = cmmi_totals(dataset, metadata, config);
    let mut flags = BTreeSet::new();

    let completion_rate = ratio(
        totals.done_tasks as f64,
        totals.total_tasks as f64,
        CmmiMeasure::CompletionRate,
        &mut flags,
    );
    let deviation = ratio(
        (totals.estimated_effort - totals.actual_effort).abs(),
        totals.estimated_effort,
        CmmiMeasure::EffortEstimationAccuracy,
        &mut flags,
    );
    let estimation_accuracy = if totals.estimated_effort == 0.0 {
        0.0
    } else {
        (1.0 - deviation).clamp(0.0, 1.0)
    };
    let bug_fixing_effort = ratio(
        totals.bug_effort,
        totals.actual_effort,
        CmmiMeasure::BugFixingEffort,
        &mut flags,
    );
    let utilization_rate = ratio(
        totals.actual_effort,
        totals.total_capacity,
        CmmiMeasure::UtilizationRate,
        &mut flags,
    );
    let productivity = ratio(
        totals.done_effort,
        totals.total_capacity,
        CmmiMeasure::Productivity,
        &mut flags,
    );

    CmmiMeasures {
        sprint_name: metadata.sprint_name.clone(),
        totals,
        completion_rate,
        estimation_accuracy,
        bug_fixing_effort,
        utilization_rate,
        productivity,
        flags,
    }
}
