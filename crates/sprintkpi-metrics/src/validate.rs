//! Validator: raw rows to a typed [`Dataset`] plus issues
//!
//! Work item issues come first in Data sheet row order, followed by
//! capacity issues in Capacity sheet row order.

use std::collections::{BTreeMap, BTreeSet};

use sprintkpi_core::{
    normalize_key, AnalysisConfig, CapacityRecord, Category, CellValue, Column, Dataset, Issue, IssueCode,
    RawCapacityRow, RawWorkItem, SprintMetadata, ValidationResult, WorkItem, CAPACITY_SHEET, DATA_SHEET,
};

/// Category values recognized as planned work
const PLANNED_CATEGORIES: [&str; 3] = ["Planned", "Committed", "Backlog"];

/// Outcome of validation
#[derive(Clone, Debug, PartialEq)]
pub struct Validated {
    pub result: ValidationResult,
    /// Typed input for aggregation; `None` when the result is an error
    pub dataset: Option<Dataset>,
}

impl Validated {
    pub fn is_error(&self) -> bool {
        self.result.is_error()
    }
}

/// Validate extracted rows.
///
/// Pure and deterministic: the same rows, capacity and configuration always
/// produce the same result.
pub fn validate(
    rows: &[RawWorkItem],
    capacity_rows: &[RawCapacityRow],
    metadata: &SprintMetadata,
    config: &AnalysisConfig,
) -> Validated {
    let (capacity, capacity_issues) = validate_capacity(capacity_rows);

    let mut issues = Vec::new();
    if rows.is_empty() {
        issues.push(Issue::new(IssueCode::E001EmptyTable, "work item table has no data rows").at(DATA_SHEET, 22));
        issues.extend(capacity_issues);
        return finish(issues, None);
    }

    let known: BTreeSet<String> = capacity.iter().map(|c| normalize_key(&c.name)).collect();
    let mut seen_ids: BTreeMap<u64, u32> = BTreeMap::new();
    let mut reported_unknown: BTreeSet<String> = BTreeSet::new();
    let mut items = Vec::with_capacity(rows.len());

    for raw in rows {
        let Some(id) = parse_id(raw.get(Column::Id)) else {
            issues.push(
                Issue::new(
                    IssueCode::W004InvalidId,
                    format!("work item id '{}' is not a whole number; row dropped", raw.get(Column::Id)),
                )
                .at(DATA_SHEET, raw.row),
            );
            continue;
        };

        if let Some(first_row) = seen_ids.get(&id) {
            issues.push(
                Issue::new(
                    IssueCode::E002DuplicateId,
                    format!("work item id {} appears twice (first at row {})", id, first_row),
                )
                .at(DATA_SHEET, raw.row),
            );
            continue;
        }
        seen_ids.insert(id, raw.row);

        let assignee = raw.get(Column::AssignedTo).as_text();
        if assignee.is_none() {
            issues.push(
                Issue::new(IssueCode::W001MissingAssignee, format!("work item {} has no assignee", id))
                    .at(DATA_SHEET, raw.row),
            );
        }

        let effort = match parse_effort(raw.get(Column::Effort)) {
            Ok(effort) => Some(effort),
            Err(reason) => {
                issues.push(
                    Issue::new(IssueCode::W002MissingEffort, format!("work item {} {}", id, reason))
                        .at(DATA_SHEET, raw.row),
                );
                None
            }
        };

        if let Some(name) = &assignee {
            let key = normalize_key(name);
            if !known.contains(&key) && reported_unknown.insert(key) {
                issues.push(
                    Issue::new(
                        IssueCode::W003UnknownCapacity,
                        format!("'{}' is not listed on the Capacity sheet; capacity unknown", name),
                    )
                    .at(DATA_SHEET, raw.row),
                );
            }
        }

        let category = match raw.get(Column::Category).as_text() {
            None => Category::Planned,
            Some(value) if config.is_adhoc(&value) => Category::AdHoc,
            Some(value) if PLANNED_CATEGORIES.iter().any(|p| p.eq_ignore_ascii_case(&value)) => {
                Category::Planned
            }
            Some(value) => {
                issues.push(
                    Issue::new(
                        IssueCode::W007UnknownCategory,
                        format!("work item {} has unrecognized category '{}'; treated as planned", id, value),
                    )
                    .at(DATA_SHEET, raw.row),
                );
                Category::Planned
            }
        };

        let created_date = raw.get(Column::CreatedDate).as_date();
        let is_addition = if raw.has_column(Column::Addition) {
            raw.get(Column::Addition).as_flag().unwrap_or(false)
        } else {
            created_date.is_some_and(|created| created > metadata.start_date)
        };

        items.push(WorkItem {
            id,
            title: raw.get(Column::Title).as_text().unwrap_or_default(),
            work_item_type: raw.get(Column::WorkItemType).as_text().unwrap_or_default(),
            state: raw.get(Column::State).as_text().unwrap_or_default(),
            assignee,
            team: raw.get(Column::Team).as_text(),
            effort,
            original_estimate: raw.get(Column::OriginalEstimate).as_number().filter(|n| *n >= 0.0),
            created_date,
            closed_date: raw.get(Column::ClosedDate).as_date(),
            is_addition,
            category,
            row: raw.row,
        });
    }

    let usable = items.iter().any(|item| item.is_staff_eligible() || item.team.is_some());
    if !usable && !issues.iter().any(Issue::is_error) {
        issues.push(Issue::new(
            IssueCode::E003NoUsableRows,
            "no work item has both an assignee and an effort, or a team",
        ));
    }

    issues.extend(capacity_issues);
    finish(issues, Some(Dataset { items, capacity }))
}

fn finish(issues: Vec<Issue>, dataset: Option<Dataset>) -> Validated {
    for issue in issues.iter().filter(|i| !i.is_error()) {
        tracing::warn!(code = issue.code.as_str(), row = issue.row, "{}", issue.message);
    }

    let result = ValidationResult::from_issues(issues);
    let dataset = if result.is_error() { None } else { dataset };
    tracing::info!(status = result.status.as_str(), issues = result.issues.len(), "validated work items");

    Validated { result, dataset }
}

fn validate_capacity(rows: &[RawCapacityRow]) -> (Vec<CapacityRecord>, Vec<Issue>) {
    let mut records: Vec<CapacityRecord> = Vec::new();
    let mut first_row: BTreeMap<String, u32> = BTreeMap::new();
    let mut issues = Vec::new();

    for raw in rows {
        let Some(name) = raw.name.as_text() else {
            issues.push(
                Issue::new(IssueCode::W005InvalidCapacity, "capacity row has no staff name; row dropped")
                    .at(CAPACITY_SHEET, raw.row),
            );
            continue;
        };

        let Some(capacity) = raw.capacity.as_number().filter(|c| *c >= 0.0) else {
            issues.push(
                Issue::new(
                    IssueCode::W005InvalidCapacity,
                    format!("capacity '{}' for '{}' is not a non-negative number; row dropped", raw.capacity, name),
                )
                .at(CAPACITY_SHEET, raw.row),
            );
            continue;
        };

        let key = normalize_key(&name);
        if let Some(first) = first_row.get(&key) {
            issues.push(
                Issue::new(
                    IssueCode::W006DuplicateCapacity,
                    format!("'{}' is listed twice; keeping the entry at row {}", name, first),
                )
                .at(CAPACITY_SHEET, raw.row),
            );
            continue;
        }
        first_row.insert(key, raw.row);

        records.push(CapacityRecord {
            name,
            capacity,
            team: raw.team.as_text(),
        });
    }

    (records, issues)
}

/// Whole, non-negative work item id
fn parse_id(value: &CellValue) -> Option<u64> {
    let n = value.as_number()?;
    (n >= 0.0 && n.fract() == 0.0 && n < 9.0e15).then_some(n as u64)
}

fn parse_effort(value: &CellValue) -> Result<f64, String> {
    if value.is_blank() {
        return Err("has no effort".into());
    }
    match value.as_number() {
        Some(n) if n < 0.0 => Err(format!("has negative effort {}", n)),
        Some(n) => Ok(n),
        None => Err(format!("has non-numeric effort '{}'", value)),
    }
}
