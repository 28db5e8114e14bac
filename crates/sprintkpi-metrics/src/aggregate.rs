//! Aggregator: staff and team rollups
//!
//! Staff rollups take staff-eligible items (assignee and effort present),
//! grouped by normalized assignee. Team rollups take every item with a
//! team, grouped by normalized team; effort missing on such an item counts
//! as 0 and lands in `unassigned_effort` together with the effort of items
//! that have no assignee. Output is sorted by key.

use std::collections::BTreeMap;

use sprintkpi_core::{
    normalize_key, AnalysisConfig, Category, Dataset, StaffAggregate, Tally, TeamAggregate, WorkItem,
};

/// Staff and team rollups of one dataset
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Aggregates {
    pub staff: Vec<StaffAggregate>,
    pub teams: Vec<TeamAggregate>,
}

/// Build staff and team rollups
pub fn aggregate(dataset: &Dataset, config: &AnalysisConfig) -> Aggregates {
    let staff = aggregate_staff(dataset, config);
    let teams = aggregate_teams(dataset, &staff, config);

    tracing::info!(staff = staff.len(), teams = teams.len(), "aggregated work items");
    Aggregates { staff, teams }
}

/// Add one item to a tally
pub fn tally_item(tally: &mut Tally, item: &WorkItem, config: &AnalysisConfig) {
    let effort = item.effort.unwrap_or(0.0);
    let done = config.is_done(&item.state);

    tally.total_tasks += 1;
    tally.total_effort += effort;
    if done {
        tally.done_tasks += 1;
        tally.done_effort += effort;
    }
    if item.is_addition {
        tally.additions += 1;
    }
    if item.category == Category::AdHoc {
        tally.adhoc += 1;
    }
    if item.is_unplanned() {
        tally.unplanned += 1;
    }
}

fn aggregate_staff(dataset: &Dataset, config: &AnalysisConfig) -> Vec<StaffAggregate> {
    let mut groups: BTreeMap<String, StaffAggregate> = BTreeMap::new();

    for item in dataset.items.iter().filter(|i| i.is_staff_eligible()) {
        let Some(name) = item.assignee.as_deref() else {
            continue;
        };
        let key = normalize_key(name);
        let entry = groups.entry(key.clone()).or_insert_with(|| {
            let record = dataset.capacity_of(name);
            StaffAggregate {
                key,
                name: name.to_string(),
                team: record.and_then(|r| r.team.clone()),
                tally: Tally::default(),
                capacity: record.map(|r| r.capacity),
                effort_by_team: BTreeMap::new(),
            }
        });

        tally_item(&mut entry.tally, item, config);
        if let Some(team) = item.team.as_deref() {
            *entry.effort_by_team.entry(normalize_key(team)).or_insert(0.0) += item.effort.unwrap_or(0.0);
            if entry.team.is_none() {
                entry.team = Some(team.to_string());
            }
        }
    }

    groups.into_values().collect()
}

fn aggregate_teams(dataset: &Dataset, staff: &[StaffAggregate], config: &AnalysisConfig) -> Vec<TeamAggregate> {
    let mut groups: BTreeMap<String, TeamAggregate> = BTreeMap::new();

    for item in &dataset.items {
        let Some(team) = item.team.as_deref() else {
            continue;
        };
        let key = normalize_key(team);
        let entry = groups.entry(key.clone()).or_insert_with(|| TeamAggregate {
            key,
            name: team.to_string(),
            tally: Tally::default(),
            capacity: None,
            members: Vec::new(),
            unassigned_effort: 0.0,
        });

        tally_item(&mut entry.tally, item, config);
        if !item.is_staff_eligible() {
            entry.unassigned_effort += item.effort.unwrap_or(0.0);
        }
    }

    for team in groups.values_mut() {
        // key -> (display name, capacity)
        let mut members: BTreeMap<String, (String, Option<f64>)> = BTreeMap::new();

        for record in &dataset.capacity {
            if record.team.as_deref().map(normalize_key).as_deref() == Some(team.key.as_str()) {
                members.insert(normalize_key(&record.name), (record.name.clone(), Some(record.capacity)));
            }
        }
        for person in staff {
            let record_team = dataset.capacity_of(&person.name).and_then(|r| r.team.as_ref());
            if record_team.is_none() && person.effort_by_team.contains_key(&team.key) {
                members
                    .entry(person.key.clone())
                    .or_insert_with(|| (person.name.clone(), person.capacity));
            }
        }

        let known: Vec<f64> = members.values().filter_map(|(_, capacity)| *capacity).collect();
        team.capacity = (!known.is_empty()).then(|| known.iter().sum());
        team.members = members.into_values().map(|(name, _)| name).collect();
    }

    groups.into_values().collect()
}
